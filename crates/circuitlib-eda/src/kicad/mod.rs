pub mod footprint;
pub mod legacy;
pub mod model;
pub mod symbol;
