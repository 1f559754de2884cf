//! # Registry Set
//!
//! [`ChannelRegistries`] owns one [`ChannelRegistry`] per (phase, direction).
//! It is built once at startup and handed to every collaborator by reference;
//! there is no implicit global.

use crate::config::RegistryConfig;
use crate::core::payload::PayloadTypeRegistry;
use crate::core::reserved::ReservedChannels;
use crate::core::side::{Direction, Phase};
use crate::error::{ChannelError, Result};
use crate::registry::ChannelRegistry;
use crate::utils::metrics::RegistryMetrics;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

pub struct ChannelRegistries<H> {
    registries: BTreeMap<(Phase, Direction), Arc<ChannelRegistry<H>>>,
    metrics: Arc<RegistryMetrics>,
}

impl<H> ChannelRegistries<H> {
    /// Build all six registries without payload type validation
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        Self::with_payload_types(config, Vec::new())
    }

    /// Build all six registries. A registry gets a payload validator when a
    /// [`PayloadTypeRegistry`] for its (phase, direction) is supplied.
    pub fn with_payload_types(
        config: &RegistryConfig,
        payload_types: Vec<Arc<PayloadTypeRegistry>>,
    ) -> Result<Self> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ChannelError::ConfigError(errors.join("; ")));
        }

        let extra_reserved = config.reserved_channel_ids()?;
        let metrics = Arc::new(RegistryMetrics::new());
        let mut registries = BTreeMap::new();

        for phase in Phase::ALL {
            for direction in Direction::ALL {
                let mut reserved = ReservedChannels::for_phase(phase);
                reserved.extend(extra_reserved.iter().cloned());

                let mut builder = ChannelRegistry::builder(phase, direction)
                    .reserved(reserved)
                    .max_channel_name_length(config.max_channel_name_length)
                    .metrics(metrics.clone());

                if let Some(types) = payload_types
                    .iter()
                    .find(|types| types.phase() == phase && types.direction() == direction)
                {
                    builder = builder.payload_validator(types.validator());
                }

                registries.insert((phase, direction), builder.build());
            }
        }

        info!(
            registries = registries.len(),
            validated = payload_types.len(),
            "Channel registries initialized"
        );

        Ok(Self {
            registries,
            metrics,
        })
    }

    /// Registry serving `phase` in `direction`
    pub fn get(&self, phase: Phase, direction: Direction) -> &Arc<ChannelRegistry<H>> {
        // Every (phase, direction) pair is populated in the constructor
        &self.registries[&(phase, direction)]
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(Phase, Direction), &Arc<ChannelRegistry<H>>)> {
        self.registries.iter()
    }

    /// Metrics shared by every registry in the set
    pub fn metrics(&self) -> &Arc<RegistryMetrics> {
        &self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::channel_id::ChannelId;

    #[test]
    fn test_all_pairs_present_and_independent() {
        let registries = ChannelRegistries::<u8>::new(&RegistryConfig::default()).unwrap();
        assert_eq!(registries.iter().count(), 6);

        let id = ChannelId::parse("mod:a").unwrap();
        let play_in = registries.get(Phase::Play, Direction::Serverbound);
        play_in.register(id.clone(), 1).unwrap();

        assert_eq!(play_in.phase(), Phase::Play);
        assert!(registries
            .get(Phase::Play, Direction::Clientbound)
            .lookup(&id)
            .unwrap()
            .is_none());
        assert_eq!(registries.metrics().snapshot().registrations, 1);
    }

    #[test]
    fn test_config_applies_to_every_registry() {
        let config = RegistryConfig {
            max_channel_name_length: 16,
            extra_reserved_channels: vec!["host:internal".to_string()],
        };
        let registries = ChannelRegistries::<u8>::new(&config).unwrap();
        let internal = ChannelId::parse("host:internal").unwrap();

        for (_, registry) in registries.iter() {
            assert!(registry.is_reserved(&internal));
            assert_eq!(registry.max_channel_name_length(), 16);
        }
    }

    #[test]
    fn test_payload_types_attach_to_matching_registry() {
        let types = Arc::new(PayloadTypeRegistry::new(Phase::Configuration, Direction::Clientbound));
        let declared = ChannelId::parse("mod:declared").unwrap();
        types.declare(declared.clone()).unwrap();

        let registries =
            ChannelRegistries::<u8>::with_payload_types(&RegistryConfig::default(), vec![types])
                .unwrap();
        let undeclared = ChannelId::parse("mod:other").unwrap();

        let validated = registries.get(Phase::Configuration, Direction::Clientbound);
        assert!(validated.register(declared, 1).unwrap());
        assert!(validated.register(undeclared.clone(), 2).is_err());

        let open = registries.get(Phase::Configuration, Direction::Serverbound);
        assert!(open.register(undeclared, 3).unwrap());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = RegistryConfig {
            max_channel_name_length: 0,
            extra_reserved_channels: vec!["broken".to_string()],
        };

        assert!(matches!(
            ChannelRegistries::<u8>::new(&config),
            Err(ChannelError::ConfigError(_))
        ));
    }
}
