//! fraudscreen-core: combined internal/external fraud-risk screening for
//! loan applicants.

pub mod applicant;
pub mod combiner;
pub mod config;
pub mod cross_verification_validator;
pub mod demo_population;
pub mod employment_validator;
pub mod error;
pub mod external_aggregator;
pub mod external_engine;
pub mod financial_validator;
pub mod identifiers;
pub mod identity_matcher;
pub mod identity_validator;
pub mod internal_aggregator;
pub mod name_generator;
pub mod registry;
pub mod rng;
pub mod rule_catalogue;
pub mod scoring;
pub mod screening_service;
pub mod store;
pub mod types;
pub mod validator;
