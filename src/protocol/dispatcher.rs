use super::request::Request;
use super::response::Response;
use crate::service::{CharacterService, Session};
use tracing::{debug, info_span, warn};

/// Turns requests into state-machine calls for one session.
///
/// Every failure becomes an error [`Response`]; nothing a client sends can
/// stop the service.
#[derive(Debug)]
pub struct Dispatcher {
    service: CharacterService,
    session: Session,
}

impl Dispatcher {
    pub fn new(service: CharacterService) -> Self {
        Self::with_session(service, Session::new())
    }

    pub fn with_session(service: CharacterService, session: Session) -> Self {
        Self { service, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Decode, dispatch and encode one raw request.
    pub fn handle_raw(&mut self, raw: &str) -> String {
        let span = info_span!("request", session = %self.session.id());
        let _enter = span.enter();
        debug!(raw = raw.trim(), "request received");

        let response = match Request::decode(raw) {
            Ok(request) => self.handle(request),
            Err(e) => {
                warn!(error = ?e, "rejected request");
                Response::from(&e)
            }
        };

        let reply = response.encode();
        debug!(reply = %reply, "reply ready");
        reply
    }

    pub fn handle(&mut self, request: Request) -> Response {
        let command = request.command();
        let svc = &self.service;
        let session = &mut self.session;

        let result = match request {
            Request::GetCharacterList => svc.list_names().map(Response::with_names),
            Request::CreateNewCharacter { name, job } => svc
                .create(session, &name, &job)
                .map(Response::with_character),
            Request::SetActiveCharacter { name } => {
                svc.select(session, &name).map(Response::with_character)
            }
            Request::GetActiveCharacter => svc.active(session).map(Response::with_character),
            Request::UpdateCharacterName { new_name } => svc
                .rename(session, &new_name)
                .map(Response::with_character),
            Request::AddExperience { exp_points } => svc
                .grant_experience(session, exp_points)
                .map(Response::with_character),
            Request::LevelUp => svc.level_up(session).map(Response::level_up),
        };

        result.unwrap_or_else(|e| {
            warn!(command, error = %e, "request failed");
            Response::from(&e)
        })
    }
}
