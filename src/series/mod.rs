pub mod combine;
pub mod daily;
pub mod metrics;

pub use combine::{combine_intraday, snap_to_minute, MetricSeries};
pub use metrics::{cuf_pct, transmission_loss_pct};
