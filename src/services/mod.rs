pub mod carts;
pub mod checkout;
pub mod content;
pub mod coupons;
pub mod payments;
pub mod pricing;
pub mod products;

pub use carts::CartService;
pub use checkout::CheckoutService;
pub use content::ContentService;
pub use coupons::CouponService;
pub use payments::{PaymentGateway, RazorpayGateway, SandboxGateway};
pub use products::ProductService;
