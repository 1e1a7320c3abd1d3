//! # backoffice
//!
//! Session-aware request gateway for the electronics-retail back office.
//! One operator credential is shared by three independently deployed
//! services (`auth`, `category`, `product`); this crate owns where that
//! credential lives, how each call finds its service, and what happens
//! when a service stops accepting the credential.
//!
//! LAYERS
//! ======
//! - [`session`]: the single stored credential (get/set/clear).
//! - [`origin`]: logical service name → normalized base URL.
//! - [`transport`]: the HTTP seam (`reqwest` in production).
//! - [`gateway`]: one call = resolve, attach, execute, classify.
//! - [`auth`]: login/register/logout and the protected-view guard.
//! - [`catalog`]: category and product operations on top of the gateway.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod error;
pub mod gateway;
pub mod origin;
pub mod session;
pub mod transport;

pub use auth::{Access, AuthClient, ProtectedView, Route, ViewState, guard};
pub use catalog::{CatalogApi, Category, FormError, NewProduct, Product, ProductForm};
pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::{Gateway, RequestDescriptor};
pub use origin::{Origin, Origins};
pub use session::{FileStorage, MemoryStorage, SessionError, SessionStore, Token, TokenStorage};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
