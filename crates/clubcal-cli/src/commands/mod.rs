pub mod create;
pub mod delete;
pub mod edit;
pub mod list;
pub mod occurrence;
pub mod publish;
pub mod show;
pub mod update;
