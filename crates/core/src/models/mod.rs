//! Domain records.

pub mod design;
pub mod order;
pub mod principal;
pub mod template;

pub use design::{
    DEFAULT_DESIGN_NAME, Design, DesignUpdate, ImageDimensions, InvalidDimensions, NewDesign,
};
pub use order::{
    ContactFlow, ContactInfo, NewOrder, Order, OrderChannel, OrderSnapshot, ValidationError,
    customer_key,
};
pub use principal::Principal;
pub use template::{
    CategoryFilter, NewTemplate, PENDING_IMAGE_URL, Template, TemplateCategory, TemplateUpdate,
    UnknownCategory, default_catalog,
};
