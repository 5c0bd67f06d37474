//! Coin data provider implementations

pub mod coinpaprika;

pub use coinpaprika::CoinPaprikaProvider;
