/*!
# Vigie DevKit - Backend de test pour le client de maintenance

Bibliothèque facilitant les tests de bout en bout du client avec:
- Un backend axum en mémoire exposant le contrat REST complet
- Injection de pannes (hors ligne, 500 par route, latence des lectures)
- Compteurs d'appels et capture des corps reçus pour les assertions
*/

pub mod stub_backend;
pub mod test_utils;

pub use stub_backend::{build_router, StubData, StubState};
pub use test_utils::{unreachable_url, TestBackend};
