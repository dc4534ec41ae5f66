pub mod category_mapper;
pub mod transaction_mapper;

pub use category_mapper::CategoryMapper;
pub use transaction_mapper::TransactionMapper;
