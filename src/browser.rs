//! Browser side of the crate: the real navigator, fetch transport, cookie
//! jar, and the JS facing `QaActions` object.
use std::rc::Rc;

use gloo_net::http::Request;
use log::{error, info, warn};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{window, Document, FormData, HtmlDocument, HtmlInputElement, KeyboardEvent, Location};

use crate::actions::{EntityId, QaAction, Vote};
use crate::config::QaConfig;
use crate::dispatch::{CookieJar, Dispatcher, FormPayload, Navigator, Transport};
use crate::error::{QaError, Result};
use crate::search;

const CONFIG_ELEMENT_ID: &str = "qa-config";

impl QaError {
    fn dom(value: JsValue) -> Self {
        QaError::Dom(format!("{:?}", value))
    }
}

fn document() -> Result<Document> {
    window()
        .and_then(|w| w.document())
        .ok_or_else(|| QaError::Dom("no document".to_string()))
}

fn location() -> Result<Location> {
    window()
        .map(|w| w.location())
        .ok_or_else(|| QaError::Dom("no window".to_string()))
}

pub struct BrowserNavigator;

impl Navigator for BrowserNavigator {
    fn assign(&self, url: &str) -> Result<()> {
        location()?.set_href(url).map_err(QaError::dom)
    }

    fn reload(&self) -> Result<()> {
        let location = location()?;
        let href = location.href().map_err(QaError::dom)?;
        location.set_href(&href).map_err(QaError::dom)
    }
}

pub struct FetchTransport;

impl Transport for FetchTransport {
    async fn post_form(&self, url: &str, form: &FormPayload) -> Result<u16> {
        let body = FormData::new().map_err(QaError::dom)?;
        for (name, value) in form.iter() {
            body.append_with_str(name, value).map_err(QaError::dom)?;
        }
        let response = Request::post(url)
            .body(body)
            .send()
            .await
            .map_err(|e| QaError::Network(e.to_string()))?;
        Ok(response.status())
    }
}

pub struct DocumentCookies;

impl CookieJar for DocumentCookies {
    fn cookie_string(&self) -> String {
        let cookies = document().and_then(|doc| {
            doc.dyn_into::<HtmlDocument>()
                .map_err(|_| QaError::Dom("not an html document".to_string()))?
                .cookie()
                .map_err(QaError::dom)
        });
        match cookies {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!("cannot read cookies: {}", e);
                String::new()
            }
        }
    }
}

type BrowserDispatcher = Dispatcher<BrowserNavigator, FetchTransport, DocumentCookies>;

thread_local! {
    static DISPATCHER: Rc<BrowserDispatcher> = Rc::new(Dispatcher::new(
        load_config(),
        BrowserNavigator,
        FetchTransport,
        DocumentCookies,
    ));
}

/// Settings from `<script type="application/json" id="qa-config">`, if the page has one.
fn load_config() -> QaConfig {
    let raw = document()
        .ok()
        .and_then(|doc| doc.get_element_by_id(CONFIG_ELEMENT_ID))
        .and_then(|el| el.text_content());
    match raw {
        Some(raw) => QaConfig::from_json_or_default(&raw),
        None => QaConfig::default(),
    }
}

fn entity_id(value: &JsValue) -> Result<EntityId, JsValue> {
    if let Some(id) = value.as_string() {
        return Ok(EntityId::from(id));
    }
    match value.as_f64() {
        Some(n) if n.is_finite() && n.fract() == 0.0 => Ok(EntityId::from(n as i64)),
        _ => Err(JsValue::from_str("entity id must be a string or an integer")),
    }
}

async fn run(action: QaAction) -> Result<JsValue, JsValue> {
    let dispatcher = DISPATCHER.with(Rc::clone);
    match dispatcher.dispatch(action).await {
        Ok(outcome) => Ok(JsValue::from_str(&outcome.to_string())),
        Err(e) => {
            error!("{}", e);
            Err(JsValue::from_str(&e.to_string()))
        }
    }
}

/// Vote and star actions for question pages. Every method returns a promise
/// that rejects when the server refuses the request.
#[wasm_bindgen]
pub struct QaActions;

#[wasm_bindgen]
impl QaActions {
    #[wasm_bindgen(js_name = starAnswer)]
    pub async fn star_answer(id: JsValue) -> Result<JsValue, JsValue> {
        run(QaAction::StarAnswer(entity_id(&id)?)).await
    }

    #[wasm_bindgen(js_name = unstarAnswer)]
    pub async fn unstar_answer(id: JsValue) -> Result<JsValue, JsValue> {
        run(QaAction::UnstarAnswer(entity_id(&id)?)).await
    }

    #[wasm_bindgen(js_name = cancelVoteQuestion)]
    pub async fn cancel_vote_question(id: JsValue) -> Result<JsValue, JsValue> {
        run(QaAction::CancelVoteQuestion(entity_id(&id)?)).await
    }

    #[wasm_bindgen(js_name = cancelVoteAnswer)]
    pub async fn cancel_vote_answer(id: JsValue) -> Result<JsValue, JsValue> {
        run(QaAction::CancelVoteAnswer(entity_id(&id)?)).await
    }

    #[wasm_bindgen(js_name = voteQuestion)]
    pub async fn vote_question(id: JsValue, is_up: bool) -> Result<JsValue, JsValue> {
        run(QaAction::VoteQuestion(entity_id(&id)?, Vote::from(is_up))).await
    }

    #[wasm_bindgen(js_name = voteAnswer)]
    pub async fn vote_answer(id: JsValue, is_up: bool) -> Result<JsValue, JsValue> {
        run(QaAction::VoteAnswer(entity_id(&id)?, Vote::from(is_up))).await
    }
}

fn attach_search_box() {
    let dispatcher = DISPATCHER.with(Rc::clone);
    let input_id = dispatcher.config().search_input_id.clone();
    let input = document()
        .ok()
        .and_then(|doc| doc.get_element_by_id(&input_id))
        .and_then(|el| el.dyn_into::<HtmlInputElement>().ok());
    let Some(input) = input else {
        warn!("no #{} input on this page, search box disabled", input_id);
        return;
    };

    let field = input.clone();
    let on_key_up = Closure::<dyn FnMut(KeyboardEvent)>::new(move |event: KeyboardEvent| {
        let Some(url) = search::on_key_up(event.key_code(), &field.value(), dispatcher.config()) else {
            return;
        };
        info!("searching: {}", url);
        if let Err(e) = dispatcher.navigator().assign(&url) {
            error!("{}", e);
        }
    });
    if let Err(e) = input.add_event_listener_with_callback("keyup", on_key_up.as_ref().unchecked_ref()) {
        error!("{}", QaError::dom(e));
        return;
    }
    on_key_up.forget();
}

/// Hook the search box up once the document has been parsed.
#[wasm_bindgen(js_name = initSearchBox)]
pub fn init_search_box() {
    let doc = match document() {
        Ok(doc) => doc,
        Err(e) => {
            warn!("{}", e);
            return;
        }
    };
    if doc.ready_state() != "loading" {
        attach_search_box();
        return;
    }
    let on_ready = Closure::once_into_js(attach_search_box);
    if let Err(e) = doc.add_event_listener_with_callback("DOMContentLoaded", on_ready.unchecked_ref()) {
        error!("{}", QaError::dom(e));
    }
}
