use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;

use log::{info, warn};

use crate::actions::{QaAction, Target};
use crate::config::{QaConfig, RequestStrategy};
use crate::cookie::get_cookie;
use crate::error::{QaError, Result};

/// Owner of the page location.
pub trait Navigator {
    fn assign(&self, url: &str) -> Result<()>;
    /// Reassign the current location to itself.
    fn reload(&self) -> Result<()>;
}

/// Sends form posts and reports the response status.
#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn post_form(&self, url: &str, form: &FormPayload) -> Result<u16>;
}

pub trait CookieJar {
    /// Raw `document.cookie` string.
    fn cookie_string(&self) -> String;
}

/// Ordered form fields of a background submit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    fields: Vec<(String, String)>,
}

impl FormPayload {
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The location was pointed at this url.
    Navigated(String),
    /// Server accepted the submit and the page was reloaded.
    Reloaded,
    /// Another action on the same entity had not settled yet.
    Skipped,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Navigated(url) => write!(f, "navigated to {}", url),
            Outcome::Reloaded => f.write_str("reloaded"),
            Outcome::Skipped => f.write_str("skipped"),
        }
    }
}

/// Marks a target busy until dropped.
struct InFlight<'a> {
    pending: &'a RefCell<HashSet<Target>>,
    target: Target,
}

impl<'a> InFlight<'a> {
    fn acquire(pending: &'a RefCell<HashSet<Target>>, target: Target) -> Option<Self> {
        if !pending.borrow_mut().insert(target.clone()) {
            return None;
        }
        Some(Self { pending, target })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.pending.borrow_mut().remove(&self.target);
    }
}

pub struct Dispatcher<N, T, C> {
    config: QaConfig,
    navigator: N,
    transport: T,
    cookies: C,
    pending: RefCell<HashSet<Target>>,
}

impl<N, T, C> Dispatcher<N, T, C>
where
    N: Navigator,
    T: Transport,
    C: CookieJar,
{
    pub fn new(config: QaConfig, navigator: N, transport: T, cookies: C) -> Self {
        Self {
            config,
            navigator,
            transport,
            cookies,
            pending: RefCell::new(HashSet::new()),
        }
    }

    pub fn config(&self) -> &QaConfig {
        &self.config
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub async fn dispatch(&self, action: QaAction) -> Result<Outcome> {
        let Some(_guard) = InFlight::acquire(&self.pending, action.target()) else {
            warn!("{} ignored, previous request still pending", action);
            return Ok(Outcome::Skipped);
        };
        info!("{}", action);

        match self.config.strategy {
            RequestStrategy::Navigation => {
                let url = self.navigation_url(&action);
                self.navigator.assign(&url)?;
                Ok(Outcome::Navigated(url))
            }
            RequestStrategy::Background => self.submit(&action).await,
        }
    }

    /// GET url used by the navigation strategy.
    pub fn navigation_url(&self, action: &QaAction) -> String {
        let url = self.config.endpoint(&action.path());
        match action.vote() {
            Some(vote) => format!("{}?like={}", url, urlencoding::encode(&vote.signal().to_string())),
            None => url,
        }
    }

    /// Form body used by the background strategy. The token field is always
    /// present, empty when the cookie is missing.
    pub fn form_payload(&self, action: &QaAction) -> FormPayload {
        let mut form = FormPayload::default();
        if let Some(vote) = action.vote() {
            form.append("like", vote.signal().to_string());
        }
        let token = get_cookie(&self.cookies.cookie_string(), &self.config.csrf_cookie).unwrap_or_else(|| {
            warn!("no {} cookie, request will likely be refused", self.config.csrf_cookie);
            String::new()
        });
        form.append(self.config.csrf_field.as_str(), token);
        form
    }

    async fn submit(&self, action: &QaAction) -> Result<Outcome> {
        let url = self.config.endpoint(&action.path());
        let form = self.form_payload(action);
        match self.transport.post_form(&url, &form).await? {
            200 => {
                self.navigator.reload()?;
                Ok(Outcome::Reloaded)
            }
            status => Err(QaError::from_status(status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{EntityId, Vote};
    use futures::executor::block_on;
    use futures::join;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    /// Pending on first poll, ready on the second.
    #[derive(Default)]
    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
            if self.0 {
                return Poll::Ready(());
            }
            self.0 = true;
            cx.waker().wake_by_ref();
            Poll::Pending
        }
    }

    #[derive(Default)]
    struct FakeNavigator {
        assigned: RefCell<Vec<String>>,
        reloads: Cell<usize>,
    }

    impl Navigator for &FakeNavigator {
        fn assign(&self, url: &str) -> Result<()> {
            self.assigned.borrow_mut().push(url.to_string());
            Ok(())
        }

        fn reload(&self) -> Result<()> {
            self.reloads.set(self.reloads.get() + 1);
            Ok(())
        }
    }

    struct FakeTransport {
        reply: Result<u16>,
        requests: RefCell<Vec<(String, FormPayload)>>,
    }

    impl FakeTransport {
        fn replying(reply: Result<u16>) -> Self {
            Self {
                reply,
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl Transport for &FakeTransport {
        async fn post_form(&self, url: &str, form: &FormPayload) -> Result<u16> {
            self.requests.borrow_mut().push((url.to_string(), form.clone()));
            YieldOnce::default().await;
            self.reply.clone()
        }
    }

    struct FakeCookies(&'static str);

    impl CookieJar for FakeCookies {
        fn cookie_string(&self) -> String {
            self.0.to_string()
        }
    }

    fn config(strategy: RequestStrategy) -> QaConfig {
        QaConfig {
            strategy,
            ..QaConfig::default()
        }
    }

    #[test]
    fn navigation_vote_answer() {
        let nav = FakeNavigator::default();
        let transport = FakeTransport::replying(Ok(200));
        let d = Dispatcher::new(config(RequestStrategy::Navigation), &nav, &transport, FakeCookies(""));

        let outcome = block_on(d.dispatch(QaAction::VoteAnswer(EntityId::from(42), Vote::Up))).unwrap();
        assert_eq!(outcome, Outcome::Navigated("/qa/answer/42/vote?like=1".to_string()));
        assert_eq!(*nav.assigned.borrow(), vec!["/qa/answer/42/vote?like=1".to_string()]);
        assert!(transport.requests.borrow().is_empty());
    }

    #[test]
    fn navigation_urls_for_every_action() {
        let nav = FakeNavigator::default();
        let transport = FakeTransport::replying(Ok(200));
        let d = Dispatcher::new(config(RequestStrategy::Navigation), &nav, &transport, FakeCookies(""));
        let id = EntityId::from(9);

        for action in [
            QaAction::StarAnswer(id.clone()),
            QaAction::UnstarAnswer(id.clone()),
            QaAction::CancelVoteQuestion(id.clone()),
            QaAction::CancelVoteAnswer(id.clone()),
            QaAction::VoteQuestion(id.clone(), Vote::Down),
        ] {
            block_on(d.dispatch(action)).unwrap();
        }
        assert_eq!(
            *nav.assigned.borrow(),
            vec![
                "/qa/answer/9/star",
                "/qa/answer/9/unstar",
                "/qa/question/9/unvote",
                "/qa/answer/9/unvote",
                "/qa/question/9/vote?like=-1",
            ]
        );
    }

    #[test]
    fn background_vote_question_posts_form_and_reloads() {
        let nav = FakeNavigator::default();
        let transport = FakeTransport::replying(Ok(200));
        let d = Dispatcher::new(
            config(RequestStrategy::Background),
            &nav,
            &transport,
            FakeCookies("sessionid=abc; csrftoken=t0k3n"),
        );

        let outcome = block_on(d.dispatch(QaAction::VoteQuestion(EntityId::from(7), Vote::Down))).unwrap();
        assert_eq!(outcome, Outcome::Reloaded);
        assert_eq!(nav.reloads.get(), 1);
        assert!(nav.assigned.borrow().is_empty());

        let requests = transport.requests.borrow();
        assert_eq!(requests.len(), 1);
        let (url, form) = &requests[0];
        assert_eq!(url, "/qa/question/7/vote");
        assert_eq!(
            form.iter().collect::<Vec<_>>(),
            vec![("like", "-1"), ("csrfmiddlewaretoken", "t0k3n")]
        );
    }

    #[test]
    fn background_star_sends_only_token() {
        let nav = FakeNavigator::default();
        let transport = FakeTransport::replying(Ok(200));
        let d = Dispatcher::new(config(RequestStrategy::Background), &nav, &transport, FakeCookies("csrftoken=t"));

        block_on(d.dispatch(QaAction::StarAnswer(EntityId::from(3)))).unwrap();
        let requests = transport.requests.borrow();
        assert_eq!(requests[0].0, "/qa/answer/3/star");
        assert_eq!(requests[0].1.len(), 1);
        assert_eq!(requests[0].1.get("like"), None);
    }

    #[test]
    fn missing_cookie_sends_empty_token() {
        let nav = FakeNavigator::default();
        let transport = FakeTransport::replying(Ok(200));
        let d = Dispatcher::new(config(RequestStrategy::Background), &nav, &transport, FakeCookies("sessionid=abc"));

        let form = d.form_payload(&QaAction::CancelVoteAnswer(EntityId::from(1)));
        assert_eq!(form.get("csrfmiddlewaretoken"), Some(""));
    }

    #[test]
    fn non_200_does_not_reload() {
        for (status, expected) in [
            (403, QaError::Forbidden),
            (400, QaError::BadRequest),
            (500, QaError::Status(500)),
        ] {
            let nav = FakeNavigator::default();
            let transport = FakeTransport::replying(Ok(status));
            let d = Dispatcher::new(config(RequestStrategy::Background), &nav, &transport, FakeCookies("csrftoken=t"));

            let err = block_on(d.dispatch(QaAction::VoteAnswer(EntityId::from(1), Vote::Up))).unwrap_err();
            assert_eq!(err, expected);
            assert_eq!(nav.reloads.get(), 0);
        }
    }

    #[test]
    fn network_error_does_not_reload() {
        let nav = FakeNavigator::default();
        let transport = FakeTransport::replying(Err(QaError::Network("connection reset".to_string())));
        let d = Dispatcher::new(config(RequestStrategy::Background), &nav, &transport, FakeCookies("csrftoken=t"));

        let err = block_on(d.dispatch(QaAction::UnstarAnswer(EntityId::from(1)))).unwrap_err();
        assert_eq!(err, QaError::Network("connection reset".to_string()));
        assert_eq!(nav.reloads.get(), 0);
    }

    #[test]
    fn repeat_on_same_entity_is_skipped_while_pending() {
        let nav = FakeNavigator::default();
        let transport = FakeTransport::replying(Ok(200));
        let d = Dispatcher::new(config(RequestStrategy::Background), &nav, &transport, FakeCookies("csrftoken=t"));
        let id = EntityId::from(11);

        let (first, second) = block_on(async {
            join!(
                d.dispatch(QaAction::VoteAnswer(id.clone(), Vote::Up)),
                d.dispatch(QaAction::StarAnswer(id.clone())),
            )
        });
        assert_eq!(first.unwrap(), Outcome::Reloaded);
        assert_eq!(second.unwrap(), Outcome::Skipped);
        assert_eq!(transport.requests.borrow().len(), 1);
        assert_eq!(nav.reloads.get(), 1);

        // settled, so the entity is free again
        let third = block_on(d.dispatch(QaAction::StarAnswer(id))).unwrap();
        assert_eq!(third, Outcome::Reloaded);
        assert_eq!(transport.requests.borrow().len(), 2);
    }

    #[test]
    fn different_entities_run_side_by_side() {
        let nav = FakeNavigator::default();
        let transport = FakeTransport::replying(Ok(200));
        let d = Dispatcher::new(config(RequestStrategy::Background), &nav, &transport, FakeCookies("csrftoken=t"));

        let (a, q) = block_on(async {
            join!(
                d.dispatch(QaAction::VoteAnswer(EntityId::from(1), Vote::Up)),
                d.dispatch(QaAction::VoteQuestion(EntityId::from(1), Vote::Up)),
            )
        });
        assert_eq!(a.unwrap(), Outcome::Reloaded);
        assert_eq!(q.unwrap(), Outcome::Reloaded);
        assert_eq!(transport.requests.borrow().len(), 2);
    }

    #[test]
    fn failed_request_releases_entity() {
        let nav = FakeNavigator::default();
        let transport = FakeTransport::replying(Ok(403));
        let d = Dispatcher::new(config(RequestStrategy::Background), &nav, &transport, FakeCookies("csrftoken=t"));

        assert!(block_on(d.dispatch(QaAction::StarAnswer(EntityId::from(2)))).is_err());
        assert!(block_on(d.dispatch(QaAction::StarAnswer(EntityId::from(2)))).is_err());
        assert_eq!(transport.requests.borrow().len(), 2);
    }

    #[test]
    fn base_url_prefixes_endpoints() {
        let nav = FakeNavigator::default();
        let transport = FakeTransport::replying(Ok(200));
        let cfg = QaConfig {
            base_url: "http://localhost:8000".to_string(),
            ..config(RequestStrategy::Background)
        };
        let d = Dispatcher::new(cfg, &nav, &transport, FakeCookies("csrftoken=t"));

        block_on(d.dispatch(QaAction::CancelVoteQuestion(EntityId::from(4)))).unwrap();
        assert_eq!(transport.requests.borrow()[0].0, "http://localhost:8000/qa/question/4/unvote");
    }
}
