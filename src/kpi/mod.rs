pub mod bundle;
pub mod engine;


pub use bundle::KpiBundle;
pub use engine::{compute_kpis, DEFAULT_TOP_N};
