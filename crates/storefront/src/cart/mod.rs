//! Shopping cart state: the shared cache, the notification bus, the cart
//! service and the surfaces that render it.

pub mod cache;
pub mod events;
pub mod gateway;
pub mod service;
pub mod session;
pub mod surface;
pub mod view;

pub use cache::{CachedCart, CartKey, LocalCartCache};
pub use events::{CART_UPDATED, CartEvent, CartEventKind, CartEvents, Subscription};
pub use gateway::CartGateway;
pub use service::{CartLoad, CartService, LoadMode};
pub use session::{CheckoutCookies, CheckoutIdStore, CookiePolicy, MemoryCheckoutIds};
pub use surface::{CartSurface, Notice, NoticeLevel, SurfaceKind, SurfaceModel, SurfaceState};
pub use view::{CartItemView, CartView, EmptyState, ImageView, hosted_checkout_url};
