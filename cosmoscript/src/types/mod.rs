mod charge;
pub use charge::*;

mod item;
pub use item::*;

mod partition;
pub use partition::*;

mod resource;
pub use resource::*;

mod response;
pub use response::*;
