use actix_web::dev::Payload;
use actix_web::http::header::HeaderMap;
use actix_web::{FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use uuid::Uuid;

use crate::domain::order::{Caller, Role};
use super::error::ApiError;

// ============================================================================
// Caller Identity
// ============================================================================
//
// The gateway in front of this service authenticates users and forwards the
// verified identity as headers. Requests without them are rejected with 401.
//
// ============================================================================

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))?
        .to_str()
        .map_err(|_| ApiError::Unauthorized(format!("{name} header is not valid text")))
}

pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, ApiError> {
    let user_id = header(headers, USER_ID_HEADER)?
        .parse::<Uuid>()
        .map_err(|_| ApiError::Unauthorized(format!("{USER_ID_HEADER} is not a UUID")))?;

    let role = header(headers, USER_ROLE_HEADER)?
        .parse::<Role>()
        .map_err(ApiError::Unauthorized)?;

    Ok(Caller { user_id, role })
}

impl FromRequest for Caller {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(caller_from_headers(req.headers()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_valid_headers() {
        let user_id = Uuid::new_v4();
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, user_id.to_string()))
            .insert_header((USER_ROLE_HEADER, "Admin"))
            .to_http_request();

        assert_eq!(caller_from_headers(req.headers()).unwrap(), Caller::admin(user_id));
    }

    #[test]
    fn test_missing_or_malformed_headers_are_unauthorized() {
        let missing_role = TestRequest::default()
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .to_http_request();
        let bad_id = TestRequest::default()
            .insert_header((USER_ID_HEADER, "42"))
            .insert_header((USER_ROLE_HEADER, "customer"))
            .to_http_request();
        let bad_role = TestRequest::default()
            .insert_header((USER_ID_HEADER, Uuid::new_v4().to_string()))
            .insert_header((USER_ROLE_HEADER, "root"))
            .to_http_request();

        for req in [missing_role, bad_id, bad_role] {
            assert!(matches!(caller_from_headers(req.headers()), Err(ApiError::Unauthorized(_))));
        }
    }
}
