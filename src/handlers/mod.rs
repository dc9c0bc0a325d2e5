// handlers/mod.rs - handlers grouped by the guard in front of them
//
// public:    no token required (/status, /auth/token)
// protected: any capability short of admin (/status/auth, /containers/*)
// elevated:  admin capability (/admin/*)
pub mod elevated;
pub mod protected;
pub mod public;
