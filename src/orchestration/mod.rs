//! Orchestration layer: wires storage, engines, and the ledger into the
//! end-to-end flows the API exposes.

pub mod distribution;
pub mod registration;

pub use distribution::{
    BinaryNetworkStats, ClassicDistribution, DistributionError, Distributor, MonolineDistribution,
    PassiveDistribution,
};
pub use registration::{Registrar, RegistrationError, RegistrationResult};
