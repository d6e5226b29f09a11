// HTTP handlers, one module per resource. Routing and the auth layer live in
// `crate::app`; handlers only translate between HTTP and the services.

pub mod categories;
pub mod multipart;
pub mod posters;
pub mod products;
pub mod root;
pub mod users;

pub use root::health as health_get;
pub use root::root as root_get;
