//! Rotas HTTP da aplicação, um módulo por painel

pub mod admin;
pub mod auth;
pub mod doctor;
pub mod emisor;
pub mod juegos;
pub mod paciente;
