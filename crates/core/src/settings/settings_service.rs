use super::{validate_fee_rate, EngineSettings, SettingsRepositoryTrait};
use crate::constants::{BASE_CURRENCY_SETTING_KEY, FEE_RATE_SETTING_KEY};
use crate::errors::{DatabaseError, Error, Result};
use crate::money::Currency;
use async_trait::async_trait;
use log::info;
use rust_decimal::Decimal;
use std::sync::Arc;

#[async_trait]
pub trait SettingsServiceTrait: Send + Sync {
    fn get_settings(&self) -> Result<EngineSettings>;

    fn get_fee_rate(&self) -> Result<Decimal>;

    fn get_base_currency(&self) -> Result<Currency>;

    async fn update_fee_rate(&self, fee_rate: Decimal) -> Result<()>;

    async fn update_base_currency(&self, currency_code: &str) -> Result<()>;

    /// Get a single raw setting value by key. Returns None if not found.
    fn get_setting_value(&self, key: &str) -> Result<Option<String>>;
}

pub struct SettingsService {
    settings_repository: Arc<dyn SettingsRepositoryTrait>,
}

impl SettingsService {
    pub fn new(settings_repository: Arc<dyn SettingsRepositoryTrait>) -> Self {
        SettingsService {
            settings_repository,
        }
    }
}

#[async_trait]
impl SettingsServiceTrait for SettingsService {
    fn get_settings(&self) -> Result<EngineSettings> {
        let fee_rate = self.get_setting_value(FEE_RATE_SETTING_KEY)?;
        let base_currency = self.get_setting_value(BASE_CURRENCY_SETTING_KEY)?;
        EngineSettings::from_values(fee_rate.as_deref(), base_currency.as_deref())
    }

    fn get_fee_rate(&self) -> Result<Decimal> {
        Ok(self.get_settings()?.fee_rate)
    }

    fn get_base_currency(&self) -> Result<Currency> {
        Ok(self.get_settings()?.base_currency)
    }

    async fn update_fee_rate(&self, fee_rate: Decimal) -> Result<()> {
        validate_fee_rate(fee_rate)?;
        self.settings_repository
            .update_setting(FEE_RATE_SETTING_KEY, &fee_rate.normalize().to_string())
            .await?;
        info!("Fee rate set to {}", fee_rate);
        Ok(())
    }

    async fn update_base_currency(&self, currency_code: &str) -> Result<()> {
        let currency = Currency::parse(currency_code)?;
        self.settings_repository
            .update_setting(BASE_CURRENCY_SETTING_KEY, currency.code())
            .await?;
        info!("Base currency set to {}", currency);
        Ok(())
    }

    fn get_setting_value(&self, key: &str) -> Result<Option<String>> {
        match self.settings_repository.get_setting(key) {
            Ok(value) => Ok(Some(value)),
            Err(Error::Database(DatabaseError::NotFound(_))) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedgerStore;
    use rust_decimal_macros::dec;

    fn service() -> SettingsService {
        SettingsService::new(Arc::new(InMemoryLedgerStore::new()))
    }

    #[tokio::test]
    async fn test_round_trips_validated_settings() {
        let service = service();
        assert_eq!(service.get_fee_rate().unwrap(), dec!(0.01));

        service.update_fee_rate(dec!(0.0050)).await.unwrap();
        service.update_base_currency("eur").await.unwrap();

        let settings = service.get_settings().unwrap();
        assert_eq!(settings.fee_rate, dec!(0.005));
        assert_eq!(settings.base_currency.code(), "EUR");
        assert_eq!(
            service.get_setting_value(FEE_RATE_SETTING_KEY).unwrap(),
            Some("0.005".to_string())
        );
    }

    #[tokio::test]
    async fn test_rejects_invalid_values() {
        let service = service();
        assert!(service.update_fee_rate(dec!(1)).await.is_err());
        assert!(matches!(
            service.update_base_currency("ABC").await,
            Err(Error::UnsupportedCurrency(_))
        ));
        assert_eq!(service.get_setting_value(BASE_CURRENCY_SETTING_KEY).unwrap(), None);
    }
}
