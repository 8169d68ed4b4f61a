//! Meters with a fixed name and tag keys whose tag values are only known at
//! runtime. Every distinct combination of tag values registers its own
//! underlying meter in a [`Registry`] the first time it is requested, and
//! later requests for the same values return that same meter.
//!
//! ```ignore
//! let registry = Arc::new(Registry::new());
//! let requests = DynamicCounter::builder(registry, "http.requests")
//!     .tag_keys(["method", "status"])
//!     .customizer(|b| b.description("handled requests"))
//!     .build();
//!
//! requests.get_or_create(&["GET", "200"])?.increment();
//! ```

mod builder;
mod config;
mod counter;
mod distribution;
mod dynamic;
mod error;
mod gauge;
mod meter;
mod registry;
mod summary;
mod tags;
mod timer;


pub use builder::{DynamicKind, DynamicMeterBuilder};
pub use config::MeterConfig;
pub use counter::{Counter, CounterBuilder, DynamicCounter};
pub use dynamic::{Customizer, DynamicMeter, ParameterlessDynamicMeter, Pipeline};
pub use error::{Error, Result};
pub use gauge::{DynamicGauge, Gauge, GaugeBuilder, GaugeFn, GaugeParams, SupplierDynamicGauge};
pub use meter::{MeterBuilder, MeterOptions};
pub use registry::{CollectedMetric, MetricValue, Registry};
pub use summary::{DistributionSummary, DistributionSummaryBuilder, DynamicDistributionSummary};
pub use tags::Tag;
pub use timer::{DynamicTimer, Timer, TimerBuilder};
