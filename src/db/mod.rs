pub mod admins;
pub mod coupons;
pub mod items;
pub mod memory_store;
pub mod payments;
pub mod rewards;
pub mod users;

pub use admins::AdminRepository;
pub use coupons::{ClaimError, CouponRepository, NewCoupon};
pub use items::ItemRepository;
pub use memory_store::{MemoryStore, StoreError, Table};
pub use payments::PaymentRepository;
pub use rewards::RewardRepository;
pub use users::UserRepository;
