pub mod aggregate;
pub mod batting;
pub mod game_info;
pub mod innings;
pub mod model;
pub mod pitching;
pub mod traits;
