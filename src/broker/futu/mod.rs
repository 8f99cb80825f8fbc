use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use crate::{
    broker::{Gateway, QuoteApi, TradeApi},
    config,
    declare::{SecurityFirm, TrdEnv, TrdMarket},
};

pub mod connection;
pub mod error;
pub mod frame;
pub mod proto;
pub mod quote;
pub mod trade;

#[cfg(test)]
pub(crate) mod fake_opend;

use connection::Connection;
use quote::FutuQuote;
use trade::FutuTrade;

/// 連線到 OpenD 的入口，每次開啟都是新的連線
#[derive(Debug, Clone)]
pub struct FutuGateway {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub timeout: Duration,
    pub trd_env: TrdEnv,
    pub security_firm: SecurityFirm,
    pub acc_id: u64,
}

impl FutuGateway {
    pub fn from_settings(app: &config::App) -> Self {
        FutuGateway {
            host: app.futu.host.clone(),
            port: app.futu.port,
            client_id: app.futu.client_id.clone(),
            timeout: Duration::from_secs(app.futu.timeout_secs.max(1)),
            trd_env: app.order.trd_env,
            security_firm: app.order.security_firm,
            acc_id: app.order.acc_id,
        }
    }

    async fn connect(&self) -> error::FutuResult<Connection> {
        Connection::connect(&self.host, self.port, &self.client_id, self.timeout).await
    }
}

#[async_trait]
impl Gateway for FutuGateway {
    async fn open_quote(&self) -> Result<Box<dyn QuoteApi>> {
        let conn = self.connect().await?;
        Ok(Box::new(FutuQuote::new(conn)))
    }

    async fn open_trade(&self, market: TrdMarket) -> Result<Box<dyn TradeApi>> {
        let conn = self.connect().await?;
        let trade = FutuTrade::open(
            conn,
            market,
            self.trd_env,
            self.security_firm,
            self.acc_id,
        )
        .await?;
        Ok(Box::new(trade))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::declare::{Market, StockCode, SubType};
    use fake_opend::FakeOpenD;

    fn gateway(port: u16) -> FutuGateway {
        let mut app = config::App::default();
        app.futu.port = port;
        app.futu.timeout_secs = 3;
        FutuGateway::from_settings(&app)
    }

    #[tokio::test]
    async fn test_open_quote() {
        let server = FakeOpenD::start(|_, _| json!({"retType": 0})).await;
        let gw = gateway(server.port);

        let mut quote = gw.open_quote().await.unwrap();
        quote
            .subscribe(
                &[StockCode::new(Market::HK, "00700")],
                &[SubType::Quote],
                false,
                None,
            )
            .await
            .unwrap();
        quote.close().await;
    }

    #[tokio::test]
    async fn test_open_trade_without_account() {
        let server = FakeOpenD::start(|_, _| json!({"retType": 0, "s2c": {"accList": []}})).await;
        let gw = gateway(server.port);

        let err = gw.open_trade(TrdMarket::HK).await.err().unwrap();
        assert!(err.to_string().contains("No trading account"), "{}", err);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        assert!(gateway(port).open_quote().await.is_err());
    }
}
