//! Collapse concurrent requests for the same key into one operation.
//!
//! The first caller for a key registers a flight and spawns the work; later
//! callers clone the shared handle and await it. Registration and lookup
//! happen under one lock acquisition, so exactly one caller ever starts the
//! work. The work runs on its own task: a caller that goes away only stops
//! waiting, it never cancels the flight for the others.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use futures::future::{BoxFuture, FutureExt, Shared};

type Flight<V> = Shared<BoxFuture<'static, Option<V>>>;
type Flights<K, V> = Arc<Mutex<HashMap<K, Flight<V>>>>;

/// In-flight operations keyed by `K`, each yielding `Option<V>`.
pub struct SingleFlight<K, V> {
    flights: Flights<K, V>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            flights: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys with an unsettled flight.
    pub fn in_flight(&self) -> usize {
        self.flights.lock().unwrap().len()
    }

    /// Join the flight for `key`, starting it with `make` if there is none.
    ///
    /// `make` is only called by the caller that registers the flight. A
    /// flight whose task panics settles as `None`.
    pub async fn run<F, Fut>(&self, key: K, make: F) -> Option<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<V>> + Send + 'static,
    {
        let flight = {
            let mut flights = self.flights.lock().unwrap();
            match flights.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let guard = Deregister {
                        flights: Arc::clone(&self.flights),
                        key: key.clone(),
                    };
                    let work = make();
                    let handle = tokio::spawn(async move {
                        let _guard = guard;
                        work.await
                    });
                    let flight = async move { handle.await.ok().flatten() }
                        .boxed()
                        .shared();
                    flights.insert(key, flight.clone());
                    flight
                }
            }
        };
        flight.await
    }
}

/// Removes a key once its task settles, panics included.
struct Deregister<K: Eq + Hash, V> {
    flights: Flights<K, V>,
    key: K,
}

impl<K: Eq + Hash, V> Drop for Deregister<K, V> {
    fn drop(&mut self) {
        if let Ok(mut flights) = self.flights.lock() {
            flights.remove(&self.key);
        }
    }
}
