pub mod asset;
pub mod resource;
pub mod subscription;
pub mod team;
pub mod team_member;
