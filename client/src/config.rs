//! # Protocol Configuration & Venue Resolution
//!
//! Every magic string the client interpolates into a manifest lives here,
//! together with the bootstrap bundle that describes the deployed protocol:
//! which Ignition component to call, which pools exist on which venue, and
//! which receipt resource each venue mints.
//!
//! The bundle is loaded once at startup and never mutated afterwards. The
//! [`ConfigurationResolver`] precomputes the venue lookups (logical name to
//! addresses, receipt resource back to logical name) so that callers never
//! rebuild them on the hot path.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Manifest Constants
// ---------------------------------------------------------------------------

/// Name of the single bucket every Ignition manifest creates.
pub const BUCKET_NAME: &str = "bucket";

/// Ignition entry point that turns a bucket of user resources into a
/// liquidity position and a receipt.
pub const OPEN_LIQUIDITY_POSITION_METHOD: &str = "open_liquidity_position";

/// Ignition entry point that redeems a receipt.
pub const CLOSE_LIQUIDITY_POSITION_METHOD: &str = "close_liquidity_position";

/// Account method that moves named non-fungibles onto the worktop.
pub const WITHDRAW_NON_FUNGIBLES_METHOD: &str = "withdraw_non_fungibles";

/// Account method that deposits everything left on the worktop, aborting
/// the transaction if the account refuses any of it.
pub const DEPOSIT_OR_ABORT_METHOD: &str = "try_deposit_batch_or_abort";

/// Manifest expression that captures the whole worktop.
pub const ENTIRE_WORKTOP_EXPRESSION: &str = "ENTIRE_WORKTOP";

/// Quantity minted by the test-network faucet. Large on purpose: the test
/// resources are worthless and users should never have to come back twice.
pub const FAUCET_MINT_AMOUNT: &str = "100000000000";

/// Display symbol used for the protocol resource in mint targets.
pub const PROTOCOL_RESOURCE_SYMBOL: &str = "XRD";

// ---------------------------------------------------------------------------
// Venues
// ---------------------------------------------------------------------------

/// The closed set of venues the client knows about, as
/// `(logical name, configuration section)` pairs.
///
/// The logical name is what users pick; the section is the top-level key
/// of the venue's entry in the bootstrap bundle.
pub const SUPPORTED_VENUES: &[(&str, &str)] =
    &[("Caviarnine", "caviarnine"), ("Ociswap", "ociswap")];

// ---------------------------------------------------------------------------
// Gateway
// ---------------------------------------------------------------------------

/// Radix mainnet network id.
pub const NETWORK_ID_MAINNET: u8 = 0x01;

/// Stokenet, the public test network.
pub const NETWORK_ID_STOKENET: u8 = 0x02;

/// Public gateway for mainnet.
pub const MAINNET_GATEWAY_URL: &str = "https://mainnet.radixdlt.com";

/// Public gateway for stokenet.
pub const STOKENET_GATEWAY_URL: &str = "https://stokenet.radixdlt.com";

/// Maximum number of ids the gateway accepts in one non-fungible data
/// request.
pub const NON_FUNGIBLE_DATA_BATCH_SIZE: usize = 100;

/// Per-request timeout for gateway calls.
pub const GATEWAY_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns the public gateway for a network id, or `None` for networks
/// without one (local simulators, private test networks).
pub fn gateway_url_for_network(network_id: u8) -> Option<&'static str> {
    match network_id {
        NETWORK_ID_MAINNET => Some(MAINNET_GATEWAY_URL),
        NETWORK_ID_STOKENET => Some(STOKENET_GATEWAY_URL),
        _ => None,
    }
}

/// Friendly network name for logging.
pub fn network_name(network_id: u8) -> String {
    match network_id {
        NETWORK_ID_MAINNET => "mainnet".to_string(),
        NETWORK_ID_STOKENET => "stokenet".to_string(),
        other => format!("unknown(0x{:02X})", other),
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while loading or querying the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A logical venue name outside the configured set was requested.
    /// The set is closed at load time, so this is a caller bug.
    #[error("unknown venue: {0}")]
    UnknownVenue(String),

    /// A supported venue has no section in the bootstrap bundle.
    #[error("venue {venue} has no `{section}` section in the configuration")]
    MissingVenueSection {
        /// Logical venue name.
        venue: String,
        /// Expected top-level key.
        section: String,
    },

    /// Two venues claim the same receipt resource, which would make
    /// positions ambiguous.
    #[error("receipt resource {resource} is shared by venues {first} and {second}")]
    DuplicateReceiptResource {
        /// The shared receipt resource address.
        resource: String,
        /// First venue claiming it.
        first: String,
        /// Second venue claiming it.
        second: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON or does not match the schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Data Model
// ---------------------------------------------------------------------------

/// Display metadata for a user resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    /// Number of decimal places the resource supports.
    pub divisibility: u8,
    /// Human-readable name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Icon location.
    pub icon_url: String,
}

/// Addresses of the protocol-wide components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolConfiguration {
    /// Package the Ignition blueprint was published in.
    pub ignition_package_address: String,
    /// The Ignition component every position manifest calls.
    pub ignition: String,
    /// Resource the protocol contributes to match users.
    pub protocol_resource: String,
    /// Package of the price oracle.
    pub oracle_package_address: String,
    /// The oracle component.
    pub oracle: String,
    /// dApp definition account.
    pub dapp_definition: String,
    /// Reward rate per lockup period, keyed by lockup length in seconds.
    #[serde(default)]
    pub reward_rates: BTreeMap<u64, Decimal>,
}

/// A lockup period users can choose, with its reward rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LockupOption {
    /// Lockup length in seconds.
    pub seconds: u64,
    /// Reward rate as a fraction (`0.4` = 40%).
    pub rate: Decimal,
}

impl ProtocolConfiguration {
    /// Returns the reward rate for a lockup period, if it is offered.
    pub fn reward_rate(&self, lockup_seconds: u64) -> Option<Decimal> {
        self.reward_rates.get(&lockup_seconds).copied()
    }

    /// Returns all offered lockup periods in ascending order.
    pub fn lockup_options(&self) -> Vec<LockupOption> {
        self.reward_rates
            .iter()
            .map(|(seconds, rate)| LockupOption {
                seconds: *seconds,
                rate: *rate,
            })
            .collect()
    }
}

/// Everything needed to act on one exchange venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueConfiguration {
    /// The venue's own package.
    pub package: String,
    /// Pool component per user resource.
    pub pools: BTreeMap<String, String>,
    /// Package of the Ignition adapter for this venue.
    pub adapter_package: String,
    /// The adapter component.
    pub adapter: String,
    /// Resource of the receipts Ignition mints for positions on this venue.
    pub receipt_resource: String,
}

impl VenueConfiguration {
    /// Returns the pool for a user resource on this venue.
    pub fn pool_for(&self, resource_address: &str) -> Option<&str> {
        self.pools.get(resource_address).map(String::as_str)
    }
}

/// The full bootstrap bundle, in the shape of the published `config.json`.
///
/// Venue sections are top-level keys next to `network_id`, `resources`
/// and `protocol`; they are collected into [`BootstrapInformation::venues`]
/// by configuration section name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BootstrapInformation {
    /// Network the bundle was published for.
    pub network_id: u8,
    /// Metadata of the user resources, keyed by resource address.
    pub resources: BTreeMap<String, ResourceMetadata>,
    /// Protocol-wide addresses.
    pub protocol: ProtocolConfiguration,
    /// Venue sections keyed by configuration section name.
    #[serde(flatten)]
    pub venues: BTreeMap<String, VenueConfiguration>,
}

// Not derived: `#[serde(flatten)]` buffers its input, which loses the
// string-to-integer key conversion `reward_rates` relies on.
impl<'de> Deserialize<'de> for BootstrapInformation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let mut root = serde_json::Map::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut take = |key: &'static str| {
            root.remove(key)
                .ok_or_else(|| D::Error::missing_field(key))
        };

        let network_id = u8::deserialize(take("network_id")?).map_err(D::Error::custom)?;
        let resources = BTreeMap::deserialize(take("resources")?).map_err(D::Error::custom)?;
        let protocol =
            ProtocolConfiguration::deserialize(take("protocol")?).map_err(D::Error::custom)?;

        let venues = root
            .into_iter()
            .map(|(section, value)| {
                VenueConfiguration::deserialize(value)
                    .map(|venue| (section.clone(), venue))
                    .map_err(|e| D::Error::custom(format!("venue section `{section}`: {e}")))
            })
            .collect::<Result<_, D::Error>>()?;

        Ok(Self {
            network_id,
            resources,
            protocol,
            venues,
        })
    }
}

impl BootstrapInformation {
    /// Parses a bundle from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads and parses a bundle from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let bundle = Self::from_json_str(&json)?;
        tracing::debug!(
            path = %path.display(),
            network = %network_name(bundle.network_id),
            venues = bundle.venues.len(),
            resources = bundle.resources.len(),
            "configuration loaded"
        );
        Ok(bundle)
    }
}

// ---------------------------------------------------------------------------
// ConfigurationResolver
// ---------------------------------------------------------------------------

/// Immutable, precomputed view over the bootstrap bundle.
///
/// Built once; afterwards every lookup is a map access. Owns the bundle for
/// the lifetime of the process.
#[derive(Debug, Clone)]
pub struct ConfigurationResolver {
    bootstrap: BootstrapInformation,
    /// Logical venue name -> venue configuration.
    venues: BTreeMap<String, VenueConfiguration>,
    /// Receipt resource -> logical venue name.
    receipt_index: HashMap<String, String>,
}

impl ConfigurationResolver {
    /// Builds a resolver for [`SUPPORTED_VENUES`].
    pub fn new(bootstrap: BootstrapInformation) -> Result<Self, ConfigError> {
        Self::with_venues(bootstrap, SUPPORTED_VENUES)
    }

    /// Builds a resolver for an explicit `(logical name, section)` list.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingVenueSection`] if a listed section is absent,
    /// [`ConfigError::DuplicateReceiptResource`] if two venues share a
    /// receipt resource.
    pub fn with_venues(
        bootstrap: BootstrapInformation,
        supported: &[(&str, &str)],
    ) -> Result<Self, ConfigError> {
        let mut venues = BTreeMap::new();
        let mut receipt_index: HashMap<String, String> = HashMap::new();

        for (logical, section) in supported {
            let venue = bootstrap.venues.get(*section).cloned().ok_or_else(|| {
                ConfigError::MissingVenueSection {
                    venue: logical.to_string(),
                    section: section.to_string(),
                }
            })?;

            if let Some(first) = receipt_index.get(&venue.receipt_resource) {
                return Err(ConfigError::DuplicateReceiptResource {
                    resource: venue.receipt_resource.clone(),
                    first: first.clone(),
                    second: logical.to_string(),
                });
            }
            receipt_index.insert(venue.receipt_resource.clone(), logical.to_string());
            venues.insert(logical.to_string(), venue);
        }

        Ok(Self {
            bootstrap,
            venues,
            receipt_index,
        })
    }

    /// Resolves a logical venue name to its addresses.
    pub fn resolve(&self, venue: &str) -> Result<&VenueConfiguration, ConfigError> {
        self.venues
            .get(venue)
            .ok_or_else(|| ConfigError::UnknownVenue(venue.to_string()))
    }

    /// Logical venue names in sorted order.
    pub fn venue_names(&self) -> impl Iterator<Item = &str> {
        self.venues.keys().map(String::as_str)
    }

    /// All venues, keyed by logical name.
    pub fn venues(&self) -> impl Iterator<Item = (&str, &VenueConfiguration)> {
        self.venues.iter().map(|(name, venue)| (name.as_str(), venue))
    }

    /// Returns `true` if the resource is the receipt resource of a
    /// configured venue.
    pub fn is_receipt_resource(&self, resource_address: &str) -> bool {
        self.receipt_index.contains_key(resource_address)
    }

    /// Returns the logical venue that mints the given receipt resource.
    pub fn venue_for_receipt(&self, receipt_resource: &str) -> Option<&str> {
        self.receipt_index.get(receipt_resource).map(String::as_str)
    }

    /// Number of configured venues.
    pub fn venue_count(&self) -> usize {
        self.venues.len()
    }

    /// Protocol-wide addresses.
    pub fn protocol(&self) -> &ProtocolConfiguration {
        &self.bootstrap.protocol
    }

    /// Address of the Ignition component.
    pub fn ignition_address(&self) -> &str {
        &self.bootstrap.protocol.ignition
    }

    /// Network id of the bundle.
    pub fn network_id(&self) -> u8 {
        self.bootstrap.network_id
    }

    /// Metadata for a user resource.
    pub fn resource(&self, resource_address: &str) -> Option<&ResourceMetadata> {
        self.bootstrap.resources.get(resource_address)
    }

    /// All user resources, keyed by address.
    pub fn resources(&self) -> &BTreeMap<String, ResourceMetadata> {
        &self.bootstrap.resources
    }

    /// Resources the test faucet can mint, as `(address, symbol)` pairs:
    /// the protocol resource first, then every user resource.
    pub fn mint_targets(&self) -> Vec<(String, String)> {
        std::iter::once((
            self.bootstrap.protocol.protocol_resource.clone(),
            PROTOCOL_RESOURCE_SYMBOL.to_string(),
        ))
        .chain(
            self.bootstrap
                .resources
                .iter()
                .map(|(address, meta)| (address.clone(), meta.symbol.clone())),
        )
        .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
