// Pipeline processing: derivation, aggregation, and enrichment

pub mod aggregate;
pub mod enrich;
pub mod transform;
