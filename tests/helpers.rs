use serde::de::DeserializeOwned;

use microservice_controller::store::{MemoryStore, Store, StoreObject};

// Parse one of the repo's example manifests
pub fn example_config<K: DeserializeOwned>(name: &str) -> K {
    let config_str = std::fs::read_to_string(format!("{}/{}", env!("CARGO_MANIFEST_DIR"), name))
        .expect("Failed to read config file");
    serde_yaml::from_str(&config_str).expect("Unable to parse config file into yaml")
}

// Store the example manifest and return it as the store sees it
pub async fn apply_example<K: StoreObject + DeserializeOwned>(store: &MemoryStore, name: &str) -> K {
    let object: K = example_config(name);
    store.create(&object).await.expect("Failed to create example object")
}
