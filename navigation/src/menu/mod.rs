pub mod external;
pub mod link_alter;
pub mod local;
pub mod tree_builder;

pub use external::{BuildOptions, ExternalMenuTreeBuilder, MenuLink, RequestContext};
pub use link_alter::LinkAlter;
pub use local::{LocalMenu, MenuSource, MenuSourceError, Viewer};
pub use tree_builder::{MenuTreeBuilder, RootElement, TreeError};
