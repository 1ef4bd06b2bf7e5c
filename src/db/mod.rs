pub mod bootstrap;
pub mod executor;
pub mod pool;

pub type DbPool = r2d2::Pool<pool::BankDbConnectionManager>;
