pub mod category;
pub mod poster;
pub mod product;
pub mod subcategory;
pub mod user;

pub use category::{Category, CategoryPatch, NewCategory};
pub use poster::{NewPoster, Poster, PosterPatch};
pub use product::{NewProduct, Product, ProductImage, ProductPatch};
pub use subcategory::SubCategory;
pub use user::{NewUser, User, UserPatch, UserView};
