use rust_decimal::Decimal;
use sea_orm::{ActiveValue, ConnectionTrait, TransactionTrait, prelude::*};

use crate::{Balance, CurrencyCode, CurrencySetting, EngineError, ResultEngine, currency_settings};

use super::{Engine, balances::rescale_all, with_group_tx, with_tx};

/// Result of a base currency change.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CurrencyChange {
    pub old: CurrencySetting,
    pub new: CurrencySetting,
    pub rescaled: Vec<Balance>,
}

impl Engine {
    /// Current base currency of the group; the default `SGD`/`1` when the
    /// group has no setting yet.
    pub async fn currency_setting(&self, group_id: i64) -> ResultEngine<CurrencySetting> {
        load_setting(&self.database, group_id).await
    }

    /// Overwrites the currency setting without touching balances.
    pub async fn set_currency_setting(
        &self,
        group_id: i64,
        setting: &CurrencySetting,
    ) -> ResultEngine<()> {
        ensure_positive(setting.rate)?;
        with_group_tx!(self, group_id, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            store_setting(&db_tx, group_id, setting).await
        })
    }

    /// Switches the base currency to `code` at `new_rate` and rescales every
    /// balance from the old rate to the new one, in one transaction.
    ///
    /// `new_rate` must come from the rate lookup before calling: no lock is
    /// held while the lookup runs.
    pub async fn change_base_currency(
        &self,
        group_id: i64,
        code: CurrencyCode,
        new_rate: Decimal,
    ) -> ResultEngine<CurrencyChange> {
        ensure_positive(new_rate)?;
        with_group_tx!(self, group_id, |db_tx| {
            self.require_group(&db_tx, group_id).await?;
            let old = load_setting(&db_tx, group_id).await?;
            let new = CurrencySetting {
                base: code,
                rate: new_rate.normalize(),
            };
            let rescaled = rescale_all(&db_tx, group_id, old.rate, new.rate).await?;
            store_setting(&db_tx, group_id, &new).await?;
            tracing::info!(
                group_id,
                from = %old.base,
                to = %new.base,
                old_rate = %old.rate,
                new_rate = %new.rate,
                "base currency changed"
            );
            Ok(CurrencyChange { old, new, rescaled })
        })
    }
}

pub(super) async fn load_setting<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
) -> ResultEngine<CurrencySetting> {
    match currency_settings::Entity::find_by_id(group_id).one(db).await? {
        Some(model) => CurrencySetting::try_from(model),
        None => Ok(CurrencySetting::default()),
    }
}

async fn store_setting<C: ConnectionTrait>(
    db: &C,
    group_id: i64,
    setting: &CurrencySetting,
) -> ResultEngine<()> {
    let active = currency_settings::ActiveModel {
        group_id: ActiveValue::Set(group_id),
        base_currency: ActiveValue::Set(setting.base.code().to_string()),
        rate: ActiveValue::Set(setting.rate.to_string()),
    };
    if currency_settings::Entity::find_by_id(group_id)
        .one(db)
        .await?
        .is_some()
    {
        active.update(db).await?;
    } else {
        active.insert(db).await?;
    }
    Ok(())
}

fn ensure_positive(rate: Decimal) -> ResultEngine<()> {
    if rate <= Decimal::ZERO {
        return Err(EngineError::InvalidRate(format!("rate must be > 0, got {rate}")));
    }
    Ok(())
}
