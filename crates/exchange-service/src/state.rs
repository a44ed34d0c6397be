use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chain_client::{ChainClient, TokenRegistry};
use exchange_core::{ActivityLog, OrderBook};
use marketmaker::{GateioPriceSource, MarketMakerDriver};
use settlement::SettlementCoordinator;
use validator::Validator;

use crate::config::Config;

/// Everything a request handler needs, wired once at startup and shared
/// behind `Arc` across the axum router. Generic over the chain client so
/// tests can swap in `FakeChainClient` without touching the handlers.
pub struct Engine<C: ChainClient> {
    pub config: Config,
    pub registry: Arc<TokenRegistry>,
    pub chain_client: Arc<C>,
    pub validator: Validator<C>,
    pub settlement: Arc<SettlementCoordinator<C>>,
    pub activity: Arc<ActivityLog>,
    books: StdMutex<HashMap<String, Arc<StdMutex<OrderBook>>>>,
    market_makers: StdMutex<HashMap<String, Arc<MarketMakerDriver<GateioPriceSource>>>>,
    price_source: Arc<GateioPriceSource>,
}

impl<C: ChainClient + 'static> Engine<C> {
    pub fn new(config: Config, registry: Arc<TokenRegistry>, chain_client: Arc<C>) -> Self {
        let settlement = Arc::new(SettlementCoordinator::new(chain_client.clone(), registry.clone()));
        let validator = Validator::new(chain_client.clone());
        let activity_path = config.activity_log_path.clone().map(std::path::PathBuf::from);

        Self {
            config,
            registry,
            chain_client,
            validator,
            settlement,
            activity: Arc::new(ActivityLog::new(activity_path)),
            books: StdMutex::new(HashMap::new()),
            market_makers: StdMutex::new(HashMap::new()),
            price_source: Arc::new(GateioPriceSource::new()),
        }
    }

    pub fn book(&self, symbol: &str) -> Arc<StdMutex<OrderBook>> {
        let mut books = self.books.lock().expect("books lock poisoned");
        books
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(StdMutex::new(OrderBook::new(symbol))))
            .clone()
    }

    pub fn symbols(&self) -> Vec<String> {
        self.books.lock().expect("books lock poisoned").keys().cloned().collect()
    }

    /// Fetches this account's bot driver, creating it against `symbol`'s
    /// book on first use. The driver shares the same per-symbol book as
    /// regular order flow, so its quotes interact with real trades.
    pub fn market_maker(&self, account: &str, symbol: &str) -> Arc<MarketMakerDriver<GateioPriceSource>> {
        let book = self.book(symbol);
        let mut drivers = self.market_makers.lock().expect("market maker lock poisoned");
        drivers
            .entry(account.to_string())
            .or_insert_with(|| MarketMakerDriver::new(self.price_source.clone(), book))
            .clone()
    }

    pub fn existing_market_maker(&self, account: &str) -> Option<Arc<MarketMakerDriver<GateioPriceSource>>> {
        self.market_makers
            .lock()
            .expect("market maker lock poisoned")
            .get(account)
            .cloned()
    }
}
