pub mod session;

use secrecy::SecretString;

#[derive(Debug)]
pub enum Action {
    Status,
    Login {
        email: String,
        password: SecretString,
        code: Option<String>,
    },
    Register {
        email: String,
        password: SecretString,
    },
    Logout,
    Check {
        path: String,
    },
    Get {
        path: String,
    },
}
