use std::sync::Arc;

use crate::models::config::GameConfig;
use crate::services::{
    broadcast::{BroadcastAdapter, DisplayNames, RoomChannels},
    platform::{AdapterFactory, PlatformAdapter},
    session_registry::SessionRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub registry: SessionRegistry,
    pub channels: RoomChannels,
    pub display_names: DisplayNames,
}

impl AppState {
    pub fn new(config: GameConfig) -> Self {
        let config = Arc::new(config);
        let channels = RoomChannels::new(config.channel_capacity);
        let display_names = DisplayNames::default();

        let factory_channels = channels.clone();
        let factory_names = display_names.clone();
        let adapters: AdapterFactory = Arc::new(move |room_id: &str| {
            Arc::new(BroadcastAdapter::new(
                room_id,
                factory_channels.clone(),
                factory_names.clone(),
            )) as Arc<dyn PlatformAdapter>
        });

        AppState {
            registry: SessionRegistry::new(config, adapters),
            channels,
            display_names,
        }
    }
}
