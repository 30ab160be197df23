//! Time taxonomy - category/code registry with parent-chain inheritance

mod service;

pub use self::service::TimeTaxonomy;
