pub mod commentaire;
pub mod dossier;
pub mod judgment;
pub mod notification;
pub mod phase;
pub mod user;
