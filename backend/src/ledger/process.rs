//! Process state machine
//!
//! `processing -> processed`, or `cancelled`. Inputs are charged at the site
//! on creation and outputs credited when the process completes. Split, merge,
//! scrap and adjustment complete in the operation that creates them.

use shared::{
    normalize_cargo, validate_identifier, Activity, CargoMap, CreateProcessInput,
    EditProcessInput, LedgerAction, Process, ProcessFilter, ProcessKey, ProcessStatus, SiteRef,
};

use super::cargo::process_cargo;
use super::context::OperationContext;
use super::error::{LedgerError, LedgerResult};
use super::items::check_cargo_lines;
use super::scope::SiteScope;
use super::store::LedgerTx;
use super::Ledger;

const ENTITY: &str = "process";

impl Ledger {
    pub fn list_processes(&self, filter: &ProcessFilter) -> Vec<&Process> {
        self.processes
            .values()
            .filter(|process| filter.matches(process))
            .collect()
    }

    /// Create a process, charging its inputs and crediting outputs for atomic types
    pub fn create_process(
        &mut self,
        ctx: &OperationContext,
        scope: &SiteScope,
        input: CreateProcessInput,
    ) -> LedgerResult<Process> {
        let company = input
            .company
            .clone()
            .unwrap_or_else(|| ctx.actor.company.clone());
        for (field, value) in [
            ("company", &company),
            ("process_id", &input.process_id),
            ("site", &input.site),
        ] {
            validate_identifier(value).map_err(|msg| LedgerError::validation(field, msg))?;
        }

        let key = ProcessKey::new(company.clone(), input.process_id.clone());
        if !ctx.actor.acts_for(&company) {
            return Err(LedgerError::CompanyMismatch {
                entity: ENTITY,
                id: key.to_string(),
                company: ctx.actor.company.clone(),
            });
        }

        let inputs = normalize_cargo(input.inputs);
        if inputs.is_empty() {
            return Err(LedgerError::EmptyInputs(input.process_id));
        }
        check_cargo_lines("inputs", &inputs, true)?;
        check_cargo_lines("outputs", &input.outputs, true)?;

        let site = SiteRef::new(company.clone(), input.site.clone());
        if !scope.require(&site)?.tracked {
            return Err(LedgerError::validation(
                "site",
                format!("site {} is not inventory-tracked", site),
            ));
        }

        if self.processes.contains_key(&key) {
            return Err(LedgerError::already_exists(ENTITY, &key));
        }

        let atomic = input.process_type.is_atomic();
        match input.status {
            None | Some(ProcessStatus::Processing) => {}
            Some(ProcessStatus::Processed) if atomic => {}
            Some(status) => return Err(LedgerError::transition(ENTITY, &key, "new", status)),
        }

        let mut process = Process {
            company,
            process_id: input.process_id,
            process_type: input.process_type,
            site: input.site,
            machine: input.machine,
            start_time: input.start_time.unwrap_or(ctx.timestamp),
            end_time: input.end_time,
            status: ProcessStatus::Processing,
            inputs,
            outputs: normalize_cargo(input.outputs),
            description: input.description,
            version: input
                .version
                .unwrap_or_else(|| ctx.schema_version.clone()),
            created_by: ctx.actor.user.clone(),
            updated_by: ctx.actor.user.clone(),
            created_at: ctx.timestamp,
            updated_at: ctx.timestamp,
        };

        let mut tx = LedgerTx::new(&self.items);
        process_cargo(
            &mut tx,
            ctx,
            scope,
            &process,
            &process.inputs,
            &CargoMap::new(),
            LedgerAction::NewProcess,
            Activity::Start,
        )?;

        if atomic {
            process_cargo(
                &mut tx,
                ctx,
                scope,
                &process,
                &process.outputs,
                &CargoMap::new(),
                LedgerAction::NewProcess,
                Activity::Finish,
            )?;
            process.status = ProcessStatus::Processed;
            process.end_time.get_or_insert(ctx.timestamp);
        }

        let written = self.commit(tx.into_changes());
        tracing::info!(
            process = %key,
            process_type = %process.process_type,
            site = %site,
            status = %process.status,
            entries = written,
            "Process created"
        );

        self.put_process(process.clone());
        Ok(process)
    }

    /// Apply a patch to a running process.
    ///
    /// Input deltas charge or refund the site. Output deltas only change the
    /// declared outputs until the process becomes `processed`, at which point
    /// every output line is credited.
    pub fn edit_process(
        &mut self,
        ctx: &OperationContext,
        scope: &SiteScope,
        key: &ProcessKey,
        patch: EditProcessInput,
    ) -> LedgerResult<Process> {
        let existing = self
            .processes
            .get(key)
            .ok_or_else(|| LedgerError::not_found(ENTITY, key))?;

        if !ctx.actor.acts_for(&existing.company) {
            return Err(LedgerError::CompanyMismatch {
                entity: ENTITY,
                id: key.to_string(),
                company: ctx.actor.company.clone(),
            });
        }

        let previous = existing.status;
        let next = patch.status.unwrap_or(previous);
        if previous.is_terminal() || !previous.can_transition_to(next) {
            return Err(LedgerError::transition(ENTITY, key, previous, next));
        }
        check_cargo_lines("input_deltas", &patch.input_deltas, false)?;
        check_cargo_lines("output_deltas", &patch.output_deltas, false)?;

        let mut process = existing.clone();
        if let Some(start_time) = patch.start_time {
            process.start_time = start_time;
        }
        if patch.end_time.is_some() {
            process.end_time = patch.end_time;
        }
        if patch.machine.is_some() {
            process.machine = patch.machine;
        }
        if patch.description.is_some() {
            process.description = patch.description;
        }
        if let Some(version) = patch.version {
            process.version = version;
        }
        process.updated_by = ctx.actor.user.clone();
        process.updated_at = ctx.timestamp;

        let mut tx = LedgerTx::new(&self.items);
        if !patch.input_deltas.is_empty() {
            process.inputs = process_cargo(
                &mut tx,
                ctx,
                scope,
                &process,
                &process.inputs,
                &patch.input_deltas,
                LedgerAction::EditProcess,
                Activity::Edit,
            )?;
        }
        if !patch.output_deltas.is_empty() {
            process.outputs = process_cargo(
                &mut tx,
                ctx,
                scope,
                &process,
                &process.outputs,
                &patch.output_deltas,
                LedgerAction::EditProcess,
                Activity::EditOutputs,
            )?;
        }

        process.status = next;
        if next == ProcessStatus::Processed {
            process_cargo(
                &mut tx,
                ctx,
                scope,
                &process,
                &process.outputs,
                &CargoMap::new(),
                LedgerAction::EditProcess,
                Activity::Finish,
            )?;
            process.end_time.get_or_insert(ctx.timestamp);
        }

        let written = self.commit(tx.into_changes());
        tracing::info!(
            process = %key,
            from_status = %previous,
            status = %process.status,
            entries = written,
            "Process edited"
        );

        self.put_process(process.clone());
        Ok(process)
    }

    /// Cancel a running process and refund its inputs
    pub fn cancel_process(
        &mut self,
        ctx: &OperationContext,
        scope: &SiteScope,
        key: &ProcessKey,
    ) -> LedgerResult<Process> {
        let existing = self
            .processes
            .get(key)
            .ok_or_else(|| LedgerError::not_found(ENTITY, key))?;

        if !ctx.actor.acts_for(&existing.company) {
            return Err(LedgerError::CompanyMismatch {
                entity: ENTITY,
                id: key.to_string(),
                company: ctx.actor.company.clone(),
            });
        }
        if existing.status.is_terminal() {
            return Err(LedgerError::transition(
                ENTITY,
                key,
                existing.status,
                ProcessStatus::Cancelled,
            ));
        }

        let mut process = existing.clone();
        process.updated_by = ctx.actor.user.clone();
        process.updated_at = ctx.timestamp;

        let mut tx = LedgerTx::new(&self.items);
        process_cargo(
            &mut tx,
            ctx,
            scope,
            &process,
            &process.inputs,
            &CargoMap::new(),
            LedgerAction::CancelProcess,
            Activity::Cancel,
        )?;

        process.status = ProcessStatus::Cancelled;

        let written = self.commit(tx.into_changes());
        tracing::info!(process = %key, entries = written, "Process cancelled");

        self.put_process(process.clone());
        Ok(process)
    }

    /// Remove a process record without touching inventory
    pub fn delete_process(
        &mut self,
        ctx: &OperationContext,
        key: &ProcessKey,
    ) -> LedgerResult<Process> {
        if !ctx.actor.is_admin() {
            return Err(LedgerError::Unauthorized(format!(
                "only an administrator may delete process {}",
                key
            )));
        }

        let removed = self
            .remove_process(key)
            .ok_or_else(|| LedgerError::not_found(ENTITY, key))?;
        tracing::warn!(process = %key, status = %removed.status, actor = %ctx.actor.user, "Process deleted");
        Ok(removed)
    }
}
