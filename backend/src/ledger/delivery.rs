//! Delivery state machine
//!
//! `loading -> shipped -> delivered`, with `cancelled` reachable from either
//! non-terminal state. Creation charges the source site; delivery credits the
//! destination; cancellation refunds the source.

use shared::{
    delivery_direction, normalize_cargo, validate_identifier, validate_route, Activity,
    CargoMap, CreateDeliveryInput, Delivery, DeliveryDirection, DeliveryFilter, DeliveryKey,
    DeliveryStatus, EditDeliveryInput, LedgerAction, SiteRef,
};

use super::cargo::process_cargo;
use super::context::OperationContext;
use super::error::{LedgerError, LedgerResult};
use super::items::check_cargo_lines;
use super::scope::SiteScope;
use super::store::LedgerTx;
use super::Ledger;

const ENTITY: &str = "delivery";

impl Ledger {
    pub fn list_deliveries(&self, filter: &DeliveryFilter) -> Vec<&Delivery> {
        self.deliveries
            .values()
            .filter(|delivery| filter.matches(delivery))
            .collect()
    }

    /// Create a delivery and charge its cargo to the source site.
    ///
    /// A delivery to an untracked destination, or one recorded by the
    /// receiving company, is delivered in the same operation.
    pub fn create_delivery(
        &mut self,
        ctx: &OperationContext,
        scope: &SiteScope,
        input: CreateDeliveryInput,
    ) -> LedgerResult<Delivery> {
        for (field, value) in [
            ("delivery_id", &input.delivery_id),
            ("from_company", &input.from_company),
            ("to_company", &input.to_company),
            ("from_site", &input.from_site),
            ("to_site", &input.to_site),
        ] {
            validate_identifier(value).map_err(|msg| LedgerError::validation(field, msg))?;
        }
        validate_route(&input.route).map_err(|msg| LedgerError::validation("route", msg))?;
        check_cargo_lines("cargo", &input.cargo, true)?;

        let key = DeliveryKey::new(input.delivery_id.clone(), input.route.clone());
        let actor = &ctx.actor;
        if !actor.acts_for(&input.from_company) && !actor.acts_for(&input.to_company) {
            return Err(LedgerError::CompanyMismatch {
                entity: ENTITY,
                id: key.to_string(),
                company: actor.company.clone(),
            });
        }

        let from = SiteRef::new(input.from_company.clone(), input.from_site.clone());
        let to = SiteRef::new(input.to_company.clone(), input.to_site.clone());
        scope.require(&from)?;
        let destination = scope.require(&to)?;

        if self.deliveries.contains_key(&key) {
            return Err(LedgerError::already_exists(ENTITY, &key));
        }

        let status = input.status.unwrap_or_default();
        if status.is_terminal() {
            return Err(LedgerError::transition(ENTITY, &key, "new", status));
        }

        let direction =
            delivery_direction(&actor.company, &input.from_company, &input.to_company);

        let mut delivery = Delivery {
            delivery_id: input.delivery_id,
            route: input.route,
            from_company: input.from_company,
            to_company: input.to_company,
            from_site: input.from_site,
            to_site: input.to_site,
            start_time: input.start_time.unwrap_or(ctx.timestamp),
            end_time: input.end_time,
            shipper: input.shipper,
            driver: input.driver,
            status,
            cargo: normalize_cargo(input.cargo),
            description: input.description,
            version: input
                .version
                .unwrap_or_else(|| ctx.schema_version.clone()),
            created_by: actor.user.clone(),
            updated_by: actor.user.clone(),
            created_at: ctx.timestamp,
            updated_at: ctx.timestamp,
        };

        let mut tx = LedgerTx::new(&self.items);
        process_cargo(
            &mut tx,
            ctx,
            scope,
            &delivery,
            &delivery.cargo,
            &CargoMap::new(),
            LedgerAction::NewDelivery,
            Activity::Send,
        )?;

        if !destination.tracked || direction == DeliveryDirection::Receive {
            process_cargo(
                &mut tx,
                ctx,
                scope,
                &delivery,
                &delivery.cargo,
                &CargoMap::new(),
                LedgerAction::NewDelivery,
                Activity::Receive,
            )?;
            delivery.status = DeliveryStatus::Delivered;
            delivery.end_time.get_or_insert(ctx.timestamp);
        }

        let written = self.commit(tx.into_changes());
        tracing::info!(
            delivery = %key,
            from = %from,
            to = %to,
            status = %delivery.status,
            entries = written,
            "Delivery created"
        );

        self.put_delivery(delivery.clone());
        Ok(delivery)
    }

    /// Apply a patch to a non-terminal delivery.
    ///
    /// Cargo deltas settle against the source site first; a status change to
    /// `delivered` then credits the destination with the whole cargo.
    pub fn edit_delivery(
        &mut self,
        ctx: &OperationContext,
        scope: &SiteScope,
        key: &DeliveryKey,
        patch: EditDeliveryInput,
    ) -> LedgerResult<Delivery> {
        let existing = self
            .deliveries
            .get(key)
            .ok_or_else(|| LedgerError::not_found(ENTITY, key))?;

        if !ctx.actor.acts_for(&existing.from_company) && !ctx.actor.acts_for(&existing.to_company)
        {
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
        check_cargo_lines("cargo_deltas", &patch.cargo_deltas, false)?;

        let mut delivery = existing.clone();
        if patch.to_company.is_some() || patch.to_site.is_some() {
            if let Some(company) = patch.to_company {
                validate_identifier(&company)
                    .map_err(|msg| LedgerError::validation("to_company", msg))?;
                delivery.to_company = company;
            }
            if let Some(site) = patch.to_site {
                validate_identifier(&site).map_err(|msg| LedgerError::validation("to_site", msg))?;
                delivery.to_site = site;
            }
            scope.require(&delivery.to_site_ref())?;
        }
        if let Some(start_time) = patch.start_time {
            delivery.start_time = start_time;
        }
        if patch.end_time.is_some() {
            delivery.end_time = patch.end_time;
        }
        if patch.shipper.is_some() {
            delivery.shipper = patch.shipper;
        }
        if patch.driver.is_some() {
            delivery.driver = patch.driver;
        }
        if patch.description.is_some() {
            delivery.description = patch.description;
        }
        if let Some(version) = patch.version {
            delivery.version = version;
        }
        delivery.updated_by = ctx.actor.user.clone();
        delivery.updated_at = ctx.timestamp;

        let mut tx = LedgerTx::new(&self.items);
        if !patch.cargo_deltas.is_empty() {
            delivery.cargo = process_cargo(
                &mut tx,
                ctx,
                scope,
                &delivery,
                &delivery.cargo,
                &patch.cargo_deltas,
                LedgerAction::EditDelivery,
                Activity::Edit,
            )?;
        }

        delivery.status = next;
        if next == DeliveryStatus::Delivered {
            process_cargo(
                &mut tx,
                ctx,
                scope,
                &delivery,
                &delivery.cargo,
                &CargoMap::new(),
                LedgerAction::EditDelivery,
                Activity::Receive,
            )?;
            delivery.end_time.get_or_insert(ctx.timestamp);
        }

        let written = self.commit(tx.into_changes());
        tracing::info!(
            delivery = %key,
            from_status = %previous,
            status = %delivery.status,
            entries = written,
            "Delivery edited"
        );

        self.put_delivery(delivery.clone());
        Ok(delivery)
    }

    /// Cancel a non-terminal delivery and refund its cargo to the source site
    pub fn cancel_delivery(
        &mut self,
        ctx: &OperationContext,
        scope: &SiteScope,
        key: &DeliveryKey,
    ) -> LedgerResult<Delivery> {
        let existing = self
            .deliveries
            .get(key)
            .ok_or_else(|| LedgerError::not_found(ENTITY, key))?;

        if !ctx.actor.acts_for(&existing.from_company) {
            return Err(LedgerError::Unauthorized(format!(
                "only the sending company may cancel delivery {}",
                key
            )));
        }
        if existing.status.is_terminal() {
            return Err(LedgerError::transition(
                ENTITY,
                key,
                existing.status,
                DeliveryStatus::Cancelled,
            ));
        }

        let mut delivery = existing.clone();
        delivery.updated_by = ctx.actor.user.clone();
        delivery.updated_at = ctx.timestamp;

        let mut tx = LedgerTx::new(&self.items);
        process_cargo(
            &mut tx,
            ctx,
            scope,
            &delivery,
            &delivery.cargo,
            &CargoMap::new(),
            LedgerAction::CancelDelivery,
            Activity::Cancel,
        )?;

        delivery.status = DeliveryStatus::Cancelled;

        let written = self.commit(tx.into_changes());
        tracing::info!(delivery = %key, entries = written, "Delivery cancelled");

        self.put_delivery(delivery.clone());
        Ok(delivery)
    }

    /// Remove a delivery record without touching inventory
    pub fn delete_delivery(
        &mut self,
        ctx: &OperationContext,
        key: &DeliveryKey,
    ) -> LedgerResult<Delivery> {
        if !ctx.actor.is_admin() {
            return Err(LedgerError::Unauthorized(format!(
                "only an administrator may delete delivery {}",
                key
            )));
        }

        let removed = self
            .remove_delivery(key)
            .ok_or_else(|| LedgerError::not_found(ENTITY, key))?;
        tracing::warn!(delivery = %key, status = %removed.status, actor = %ctx.actor.user, "Delivery deleted");
        Ok(removed)
    }
}
