#[cfg(test)]
mod tests {
    use crate::errors::Error;
    use crate::events::{DomainEvent, MockDomainEventSink, NoOpDomainEventSink};
    use crate::ledger::{InMemoryLedgerStore, LedgerStoreTrait};
    use crate::market_prices::{
        MarketPriceService, MarketPriceServiceTrait, PricingProviderTrait, PricingService,
    };
    use crate::money::{Currency, Money};
    use crate::portfolios::{
        ManualTotals, NewPortfolio, Portfolio, PortfolioService, PortfolioServiceTrait,
    };
    use crate::positions::{InvestmentType, NewPosition, Position};
    use crate::settings::SettingsRepositoryTrait;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn usd(amount: Decimal) -> Money {
        Money::parse(amount, "USD").unwrap()
    }

    async fn portfolio(service: &PortfolioService, name: &str) -> Portfolio {
        service
            .create_portfolio(NewPortfolio {
                id: None,
                user_id: "user-1".to_string(),
                name: name.to_string(),
                description: None,
                currency: Currency::parse("USD").unwrap(),
            })
            .await
            .unwrap()
    }

    async fn position(service: &PortfolioService, portfolio_id: &str, symbol: &str) -> Position {
        service
            .add_position(NewPosition {
                id: None,
                portfolio_id: portfolio_id.to_string(),
                order_id: None,
                investment_type: InvestmentType::MutualFund,
                name: format!("{} fund", symbol),
                symbol: Some(symbol.to_string()),
                quantity: dec!(100),
                purchase_price: usd(dec!(10)),
                current_price: None,
                purchase_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                maturity_date: None,
                interest_rate: None,
                status: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_update_price_reprices_positions_across_portfolios() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let ledger: Arc<dyn LedgerStoreTrait> = store.clone();
        let sink = MockDomainEventSink::new();
        let portfolios = PortfolioService::new(
            ledger.clone(),
            store.clone(),
            store.clone(),
            Arc::new(NoOpDomainEventSink),
        );
        let prices = MarketPriceService::new(ledger, store.clone(), Arc::new(sink.clone()));

        let auto = portfolio(&portfolios, "Auto").await;
        let manual = portfolio(&portfolios, "Manual").await;
        let in_auto = position(&portfolios, &auto.id, "VTI").await;
        position(&portfolios, &manual.id, "VTI").await;
        let untouched = position(&portfolios, &auto.id, "BND").await;
        portfolios
            .set_manual_totals(&manual.id, ManualTotals::new(dec!(1), dec!(1), dec!(0)))
            .await
            .unwrap();

        let recorded = prices.update_price(" VTI ", usd(dec!(12.5))).await.unwrap();
        assert_eq!(recorded.symbol, "VTI");
        assert_eq!(prices.get_price("VTI").unwrap().unwrap().price, usd(dec!(12.5)));

        let positions = portfolios.get_positions(&auto.id).unwrap();
        let repriced = positions.iter().find(|p| p.id == in_auto.id).unwrap();
        assert_eq!(repriced.current_price, usd(dec!(12.5)));
        let other = positions.iter().find(|p| p.id == untouched.id).unwrap();
        assert_eq!(other.current_price, usd(dec!(10)));

        // 100 x 12.5 + 100 x 10
        let auto_totals = portfolios.get_portfolio(&auto.id).unwrap().totals;
        assert_eq!(auto_totals.total_value.amount(), dec!(2250));

        let manual_after = portfolios.get_portfolio(&manual.id).unwrap();
        assert_eq!(manual_after.totals.total_value.amount(), dec!(1));
        assert_eq!(portfolios.list_adjustments(&manual.id).unwrap().len(), 2);

        match &sink.events()[0] {
            DomainEvent::MarketPriceUpdated {
                symbol,
                position_ids,
            } => {
                assert_eq!(symbol, "VTI");
                assert_eq!(position_ids.len(), 2);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_price_rejects_bad_input() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let prices = MarketPriceService::new(
            store.clone() as Arc<dyn LedgerStoreTrait>,
            store.clone(),
            Arc::new(NoOpDomainEventSink),
        );
        assert!(matches!(
            prices.update_price("  ", usd(dec!(1))).await,
            Err(Error::Validation(_))
        ));
        assert!(prices.update_price("VTI", usd(dec!(-1))).await.is_err());
        assert!(prices.list_prices().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_pricing_service_reads_settings_and_prices() {
        let store = Arc::new(InMemoryLedgerStore::new());
        let pricing = PricingService::new(store.clone(), store.clone());
        assert_eq!(pricing.fee_rate().unwrap(), dec!(0.01));
        assert_eq!(pricing.current_price("VTI").unwrap(), None);

        store.update_setting("fee_rate", "0.015").await.unwrap();
        assert_eq!(pricing.fee_rate().unwrap(), dec!(0.015));

        store.update_setting("fee_rate", "1.5").await.unwrap();
        assert!(pricing.fee_rate().is_err());
    }
}
