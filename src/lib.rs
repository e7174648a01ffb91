pub mod api;
pub mod config;
pub mod db;
pub mod directory;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use config::Config;
pub use db::{init_db, Repository};
pub use directory::MemberDirectory;
pub use domain::{
    CommissionStructure, CommissionTransaction, Decimal, Member, MemberCode, MemberId, Side,
    TimeMs, Wallet,
};
pub use error::AppError;
