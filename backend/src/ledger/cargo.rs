//! Applies cargo plans for deliveries and processes to the item ledger

use shared::{plan_cargo, Activity, CargoMap, ItemKey, LedgerAction, Movable};

use super::context::OperationContext;
use super::error::LedgerResult;
use super::scope::SiteScope;
use super::store::LedgerTx;
use super::upsert::DeltaRequest;

/// Walk `current` (full-cargo mode) or `deltas` (delta mode) and apply each
/// non-zero inventory change through the upsert engine.
///
/// Changes at untracked sites are outside the ledger and are skipped.
/// Returns the cargo map after the change.
#[allow(clippy::too_many_arguments)]
pub fn process_cargo<M: Movable + ?Sized>(
    tx: &mut LedgerTx<'_>,
    ctx: &OperationContext,
    scope: &SiteScope,
    entity: &M,
    current: &CargoMap,
    deltas: &CargoMap,
    action: LedgerAction,
    activity: Activity,
) -> LedgerResult<CargoMap> {
    let plan = plan_cargo(entity, current, deltas, activity)?;
    let entity_id = entity.id();
    let timestamp = entity.updated_at();

    for planned in &plan.deltas {
        if !scope.is_tracked(&planned.site) {
            tracing::debug!(
                site = %planned.site,
                item = %planned.item,
                delta = %planned.delta,
                "Skipping delta at untracked site"
            );
            continue;
        }

        tx.apply_delta(
            ctx,
            DeltaRequest {
                key: ItemKey::at(&planned.site, planned.item.clone()),
                product: &planned.product,
                delta: planned.delta,
                metadata: &planned.metadata,
                parent_action: action.as_str(),
                parent_action_id: &entity_id,
                version: None,
                timestamp,
            },
        )?;
    }

    Ok(plan.cargo)
}
