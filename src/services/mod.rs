pub mod category_service;
pub mod poster_service;
pub mod product_service;
pub mod user_service;

pub use category_service::{CategoryForm, CategoryService};
pub use poster_service::{PosterForm, PosterService};
pub use product_service::{ProductForm, ProductService};
pub use user_service::{LoginRequest, LoginResponse, RegisterRequest, UpdateUserRequest, UserService};

/// Trimmed value, or `None` when absent or blank.
pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// For optional fields on update: absent keeps the stored value, a blank
/// value clears it.
pub(crate) fn clearable(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| non_blank(Some(v)))
}
