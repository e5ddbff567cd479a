//! Sea-ORM entity definitions for the storefront document model.

pub mod cart;
pub mod cart_item;
pub mod coupon;
pub mod order;
pub mod order_item;
pub mod product;
pub mod site_content;
pub mod user;

// Re-export entities
pub use cart::{Entity as Cart, Model as CartModel};
pub use cart_item::{Entity as CartItem, Model as CartItemModel};
pub use coupon::{CouponKind, Entity as Coupon, Model as CouponModel};
pub use order::{Entity as Order, Model as OrderModel, OrderStatus};
pub use order_item::{Entity as OrderItem, Model as OrderItemModel};
pub use product::{Entity as Product, Model as ProductModel};
pub use site_content::{Entity as SiteContent, MediaKind, Model as SiteContentModel};
pub use user::{Entity as User, Model as UserModel};
