#![allow(dead_code)]

use core::{cell::RefCell, time::Duration};
use futures::{channel::oneshot, executor::LocalPool, future::LocalBoxFuture, FutureExt};
use std::{collections::BTreeMap, rc::Rc};
use storefront_dom::{
	bus::Subscription,
	config::Config,
	history::{MemoryHistory, MemoryNavigator},
	runtime::ManualScheduler,
	storage::MemoryStore,
	sync::{Method, Request, Response, Transport, TransportError},
	vdom::{VDocument, VNode},
	DomainEvent, EventKind, Page, Seams,
};
use url::Url;

pub const BASE: &str = "https://shop.example/collections/all";

type Reply = oneshot::Sender<Result<Response, TransportError>>;

/// Records every request. Canned replies answer immediately, everything else waits for [`MockTransport::resolve`].
#[derive(Default)]
pub struct MockTransport {
	log: RefCell<Vec<Request>>,
	pending: RefCell<BTreeMap<usize, Reply>>,
	canned: RefCell<Vec<(Method, String, Response)>>,
}

impl MockTransport {
	/// Answers every later `method` request to `path` with `response`.
	pub fn reply_to(&self, method: Method, path: &str, response: Response) {
		self.canned.borrow_mut().push((method, path.to_owned(), response));
	}

	pub fn requests(&self) -> Vec<Request> {
		self.log.borrow().clone()
	}

	pub fn count(&self) -> usize {
		self.log.borrow().len()
	}

	pub fn request(&self, index: usize) -> Request {
		self.log.borrow()[index].clone()
	}

	/// Index of the first request matching `predicate`.
	pub fn find(&self, predicate: impl Fn(&Request) -> bool) -> Option<usize> {
		self.log.borrow().iter().position(predicate)
	}

	/// Index of the first request for `section_id`.
	pub fn find_section(&self, section_id: &str) -> Option<usize> {
		self.find(|request| request.url.query_pairs().any(|(key, value)| key == "section_id" && value == section_id))
	}

	pub fn is_pending(&self, index: usize) -> bool {
		self.pending.borrow().contains_key(&index)
	}

	/// # Panics
	///
	/// Iff request `index` isn't waiting for a reply.
	pub fn resolve(&self, index: usize, response: Response) {
		let sender = self.pending.borrow_mut().remove(&index).unwrap_or_else(|| panic!("request {} isn't pending", index));
		let _ = sender.send(Ok(response));
	}

	pub fn fail(&self, index: usize) {
		let sender = self.pending.borrow_mut().remove(&index).unwrap_or_else(|| panic!("request {} isn't pending", index));
		let _ = sender.send(Err(TransportError("connection reset".into())));
	}
}

impl Transport for MockTransport {
	fn send(&self, request: Request) -> LocalBoxFuture<'static, Result<Response, TransportError>> {
		let index = {
			let mut log = self.log.borrow_mut();
			log.push(request.clone());
			log.len() - 1
		};
		let canned = self
			.canned
			.borrow()
			.iter()
			.find(|(method, path, _)| *method == request.method && request.url.path() == path)
			.map(|(_, _, response)| response.clone());
		if let Some(response) = canned {
			return futures::future::ready(Ok(response)).boxed_local();
		}

		let (sender, receiver) = oneshot::channel();
		self.pending.borrow_mut().insert(index, sender);
		async move { receiver.await.unwrap_or_else(|_| Err(TransportError("dropped".into()))) }.boxed_local()
	}
}

pub fn json(status: u16, value: &serde_json::Value) -> Response {
	Response::new(status, value.to_string())
}

pub fn html(body: &str) -> Response {
	Response::new(200, body)
}

/// A [`Page`] over a [`VDocument`], with every seam under the test's control.
pub struct Harness {
	pool: RefCell<LocalPool>,
	pub document: Rc<VDocument>,
	pub transport: Rc<MockTransport>,
	pub scheduler: Rc<ManualScheduler>,
	pub history: Rc<MemoryHistory>,
	pub navigator: Rc<MemoryNavigator>,
	pub local: Rc<MemoryStore>,
	pub page: Page<VDocument>,
}

impl Harness {
	pub fn new(body: &str) -> Self {
		Self::at(BASE, body, Config::default())
	}

	pub fn at(url: &str, body: &str, config: Config) -> Self {
		let pool = LocalPool::new();
		let document = Rc::new(VDocument::from_body(body).expect("test markup"));
		let transport = Rc::new(MockTransport::default());
		let scheduler = Rc::new(ManualScheduler::new());
		let history = Rc::new(MemoryHistory::new(Url::parse(url).expect("test URL")));
		let navigator = Rc::new(MemoryNavigator::new());
		let local = Rc::new(MemoryStore::new());
		let page = Page::new(
			Seams {
				document: Rc::clone(&document),
				transport: transport.clone(),
				spawner: Rc::new(pool.spawner()),
				scheduler: scheduler.clone(),
				history: history.clone(),
				navigator: navigator.clone(),
				session: Rc::new(MemoryStore::new()),
				local: local.clone(),
			},
			config,
		)
		.expect("default routes resolve");
		Self {
			pool: RefCell::new(pool),
			document,
			transport,
			scheduler,
			history,
			navigator,
			local,
			page,
		}
	}

	/// Polls spawned tasks until none can make progress.
	pub fn run(&self) {
		self.pool.borrow_mut().run_until_stalled();
	}

	/// Moves the clock, then lets whatever the timers spawned run.
	pub fn advance(&self, millis: u64) {
		self.scheduler.advance(Duration::from_millis(millis));
		self.run();
	}

	/// # Panics
	///
	/// Iff nothing in the document matches `selector`.
	pub fn node(&self, selector: &str) -> VNode {
		self.document.select(selector).unwrap_or_else(|| panic!("no element matches {:?}", selector))
	}

	pub fn record(&self, kinds: &[EventKind]) -> Recorder {
		let events: Rc<RefCell<Vec<DomainEvent>>> = Rc::default();
		let subscriptions = kinds
			.iter()
			.map(|&kind| {
				let events = Rc::clone(&events);
				self.page.bus.subscribe(kind, move |event| events.borrow_mut().push(event.clone()))
			})
			.collect();
		Recorder { events, _subscriptions: subscriptions }
	}
}

/// Events published while it's alive.
pub struct Recorder {
	events: Rc<RefCell<Vec<DomainEvent>>>,
	_subscriptions: Vec<Subscription>,
}

impl Recorder {
	pub fn events(&self) -> Vec<DomainEvent> {
		self.events.borrow().clone()
	}

	pub fn kinds(&self) -> Vec<EventKind> {
		self.events.borrow().iter().map(DomainEvent::kind).collect()
	}
}
