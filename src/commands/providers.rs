//! Providers command implementation.

use crate::config::Config;
use crate::provider::{Network, ProviderInstance};

fn parse_network(name: &str) -> anyhow::Result<Network> {
    match name.to_ascii_lowercase().as_str() {
        "mainnet" => Ok(Network::Mainnet),
        "testnet" => Ok(Network::Testnet),
        "simnet" => Ok(Network::Simnet),
        other => anyhow::bail!("Unknown network '{}' (expected mainnet, testnet or simnet)", other),
    }
}

/// Configured providers, optionally restricted to one network.
pub fn list_providers(config: &Config, network: Option<&str>) -> anyhow::Result<Vec<ProviderInstance>> {
    let network = network.map(parse_network).transpose()?;
    Ok(config
        .provider_instances()
        .into_iter()
        .filter(|p| network.map_or(true, |n| p.network == n))
        .collect())
}

/// Prints the configured providers as a table.
pub fn command_providers(config: &Config, network: Option<String>) -> anyhow::Result<()> {
    let providers = list_providers(config, network.as_deref())?;

    println!("📋 Configured Providers");
    println!("=======================\n");
    println!(
        "{:<24} {:<10} {:<8} {:<12} URL",
        "ID", "FAMILY", "NETWORK", "LAUNCHED"
    );
    for p in &providers {
        println!(
            "{:<24} {:<10} {:<8} {:<12} {}",
            p.id,
            p.family.to_string(),
            p.network.to_string(),
            p.launched,
            p.url
        );
    }
    println!("\nTotal: {} providers", providers.len());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_by_network() {
        let config = Config::default();
        let testnet = list_providers(&config, Some("Testnet")).unwrap();
        assert!(!testnet.is_empty());
        assert!(testnet.iter().all(|p| p.network == Network::Testnet));

        let all = list_providers(&config, None).unwrap();
        assert_eq!(all.len(), config.providers.len());

        assert!(list_providers(&config, Some("regnet")).is_err());
    }
}
