use actix_web::web::{self};

pub mod routes {
    pub mod sub;
}

pub mod services {
    pub mod state;
}

mod dtos {
    pub(crate) mod sub;
}

pub mod models {
    pub mod state;
    pub mod sub;
}

mod misc {
    pub(crate) mod options;
}

pub use models::state::{Classification, SubscriptionState, SuggestedAction};
pub use models::sub::Subscription;
pub use services::state::{ActiveLabel, CancelPrecedence, ClassifierOptions, classify};

pub fn mount_subs() -> actix_web::Scope {
    web::scope("/sub").service(routes::sub::post_state)
}
