use std::sync::Mutex;

use actix_cors::Cors;
use actix_web::{delete, get, post, put, web, App, HttpResponse, HttpServer, Responder};
use clap::Parser;
use serde::Deserialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use markov_graph_core::model::generation_input::DEFAULT_MAX_TOKENS;
use markov_graph_core::{GenerationInput, GraphError, GraphRegistry, StartSeed};

/// Command-line and environment configuration.
#[derive(Parser, Debug)]
#[command(version, about = "HTTP front end for token transition graphs")]
struct Config {
	/// Address to bind.
	#[arg(long, env = "MARKOV_HOST", default_value = "127.0.0.1")]
	host: String,

	/// Port to bind.
	#[arg(long, env = "MARKOV_PORT", default_value_t = 5000)]
	port: u16,

	/// Token budget used when a generate request does not give one.
	#[arg(long, default_value_t = DEFAULT_MAX_TOKENS)]
	default_max_tokens: usize,
}

/// Struct representing query parameters for the `generate` endpoint
#[derive(Deserialize)]
struct GenerateParams {
	max_tokens: Option<usize>,
	seed: Option<String> // -> first, random or custom:<token>
}

#[derive(Deserialize)]
struct CombineQuery {
	names: Option<String>,
	into: Option<String>
}

struct SharedData {
	registry: GraphRegistry,
	default_max_tokens: usize
}

impl GenerateParams {
	/// Determines the start token strategy for generation.
	fn start_seed(&self) -> Result<StartSeed, String> {
		match &self.seed {
			None => Ok(StartSeed::First),
			Some(s) if s.to_lowercase() == "first" => Ok(StartSeed::First),
			Some(s) if s.to_lowercase() == "random" => Ok(StartSeed::Random),
			Some(s) if s.to_lowercase().starts_with("custom:") => {
				let value = &s["custom:".len()..];
				if value.is_empty() {
					Err("Custom seed cannot be empty".into())
				} else {
					Ok(StartSeed::Custom(value.to_owned()))
				}
			}
			Some(_) => Err("Seed must be 'first', 'random' or start with 'custom:'".into()),
		}
	}
}

/// Maps a core error to a response.
fn error_response(error: GraphError) -> HttpResponse {
	match error {
		GraphError::UnknownGraph(_) => HttpResponse::NotFound().body(error.to_string()),
		GraphError::DuplicateGraph(_) => HttpResponse::Conflict().body(error.to_string()),
		GraphError::MalformedPortableForm(_) | GraphError::InvalidInput(_) => {
			HttpResponse::BadRequest().body(error.to_string())
		}
		GraphError::Encoding(_) => HttpResponse::InternalServerError().body(error.to_string()),
	}
}

macro_rules! lock_or_500 {
	($data:expr) => {
		match $data.lock() {
			Ok(guard) => guard,
			Err(_) => return HttpResponse::InternalServerError().body("Registry lock failed"),
		}
	};
}

/// HTTP POST endpoint `/v1/graphs/{name}/train`
///
/// Tokenizes the raw text body and trains the named graph on it,
/// creating the graph on first use.
#[post("/v1/graphs/{name}/train")]
async fn post_train(data: web::Data<Mutex<SharedData>>, name: web::Path<String>, body: String) -> impl Responder {
	let mut shared_data = lock_or_500!(data);

	match shared_data.registry.train(&name, &body) {
		Ok(tokens) => HttpResponse::Ok().body(format!("Trained {name} on {tokens} tokens")),
		Err(e) => HttpResponse::BadRequest().body(e.to_string()),
	}
}

/// HTTP GET endpoint `/v1/graphs/{name}/generate`
///
/// Generates text from the named graph based on query parameters.
#[get("/v1/graphs/{name}/generate")]
async fn get_generated(data: web::Data<Mutex<SharedData>>, name: web::Path<String>, query: web::Query<GenerateParams>) -> impl Responder {
	let start_seed = match query.start_seed() {
		Ok(s) => s,
		Err(e) => return HttpResponse::BadRequest().body(e)
	};

	let shared_data = lock_or_500!(data);

	let mut input = match GenerationInput::new(query.max_tokens.unwrap_or(shared_data.default_max_tokens)) {
		Ok(input) => input,
		Err(e) => return error_response(e)
	};
	input.start_seed = start_seed;

	match shared_data.registry.generate(&name, &input) {
		Ok(outcome) => {
			for warning in &outcome.warnings {
				warn!(graph = %name, %warning, "generation degraded");
			}
			HttpResponse::Ok().body(outcome.value)
		}
		Err(e) => error_response(e),
	}
}

#[get("/v1/graphs")]
async fn get_graphs(data: web::Data<Mutex<SharedData>>) -> impl Responder {
	let shared_data = lock_or_500!(data);
	HttpResponse::Ok().body(shared_data.registry.names().join("\n"))
}

#[delete("/v1/graphs/{name}")]
async fn delete_graph(data: web::Data<Mutex<SharedData>>, name: web::Path<String>) -> impl Responder {
	let mut shared_data = lock_or_500!(data);
	match shared_data.registry.remove(&name) {
		Ok(_) => HttpResponse::Ok().body(format!("Removed {name}")),
		Err(e) => error_response(e),
	}
}

#[get("/v1/graphs/{name}/portable")]
async fn get_portable(data: web::Data<Mutex<SharedData>>, name: web::Path<String>) -> impl Responder {
	let shared_data = lock_or_500!(data);
	match shared_data.registry.export(&name) {
		Ok(text) => HttpResponse::Ok().content_type("application/json").body(text),
		Err(e) => error_response(e),
	}
}

#[put("/v1/graphs/{name}/portable")]
async fn put_portable(data: web::Data<Mutex<SharedData>>, name: web::Path<String>, body: String) -> impl Responder {
	let mut shared_data = lock_or_500!(data);
	match shared_data.registry.import(&name, &body) {
		Ok(graph) => HttpResponse::Ok().body(format!("Loaded {name} with {} nodes", graph.len())),
		Err(e) => error_response(e),
	}
}

#[put("/v1/combine")]
async fn put_combine(data: web::Data<Mutex<SharedData>>, query: web::Query<CombineQuery>) -> impl Responder {
	let query_names = match &query.names {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty graph names"),
	};
	let into = match &query.into {
		Some(s) if !s.trim().is_empty() => s.trim(),
		_ => return HttpResponse::BadRequest().body("Missing or empty target name"),
	};

	let names: Vec<&str> = query_names
		.split(',')
		.map(|s| s.trim())
		.filter(|s| !s.is_empty())
		.collect();

	let mut shared_data = lock_or_500!(data);
	match shared_data.registry.combine(&names, into) {
		Ok(graph) => HttpResponse::Ok().body(format!("Combined into {into} with {} nodes", graph.len())),
		Err(e) => error_response(e),
	}
}

/// Registers every endpoint.
fn configure(cfg: &mut web::ServiceConfig) {
	cfg.service(post_train)
		.service(get_generated)
		.service(get_graphs)
		.service(delete_graph)
		.service(get_portable)
		.service(put_portable)
		.service(put_combine);
}

/// Main entry point for the server.
///
/// Wraps the graph registry in a `Mutex` and starts an Actix-web HTTP
/// server. CORS is permissive so a browser front end can call it.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
		.init();

	let config = Config::parse();
	let shared_data = SharedData {
		registry: GraphRegistry::new(),
		default_max_tokens: config.default_max_tokens,
	};
	let shared_registry = web::Data::new(Mutex::new(shared_data));

	info!(host = %config.host, port = config.port, "starting server");

	HttpServer::new(move || {
		App::new()
			.wrap(Cors::permissive())
			.app_data(shared_registry.clone())
			.configure(configure)
	})
		.bind((config.host.as_str(), config.port))?
		.run()
		.await
}

#[cfg(test)]
mod tests {
	use super::*;
	use actix_web::http::StatusCode;
	use actix_web::test;

	fn shared() -> web::Data<Mutex<SharedData>> {
		web::Data::new(Mutex::new(SharedData { registry: GraphRegistry::new(), default_max_tokens: 10 }))
	}

	#[actix_web::test]
	async fn train_then_generate() {
		let app = test::init_service(App::new().app_data(shared()).configure(configure)).await;

		let req = test::TestRequest::post().uri("/v1/graphs/song/train").set_payload("la di da").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

		let req = test::TestRequest::get().uri("/v1/graphs/song/generate?max_tokens=2").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(body, "La di da");

		let req = test::TestRequest::get().uri("/v1/graphs/song/generate?max_tokens=0&seed=custom:hum").to_request();
		assert_eq!(test::call_and_read_body(&app, req).await, "Hum");
	}

	#[actix_web::test]
	async fn bad_requests() {
		let app = test::init_service(App::new().app_data(shared()).configure(configure)).await;

		let req = test::TestRequest::post().uri("/v1/graphs/empty/train").set_payload("  ").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = test::TestRequest::get().uri("/v1/graphs/missing/generate").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NOT_FOUND);

		let req = test::TestRequest::get().uri("/v1/graphs/missing/generate?seed=sideways").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = test::TestRequest::put().uri("/v1/graphs/broken/portable").set_payload("not json").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

		let req = test::TestRequest::put()
			.uri("/v1/graphs/broken/portable")
			.set_payload(r#"{"a":{"b":9000000000000000000}}"#)
			.to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
	}

	#[actix_web::test]
	async fn combine_and_portable() {
		let app = test::init_service(App::new().app_data(shared()).configure(configure)).await;

		for (name, text) in [("a", "one two"), ("b", "one three")] {
			let req = test::TestRequest::post().uri(&format!("/v1/graphs/{name}/train")).set_payload(text).to_request();
			assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
		}

		let req = test::TestRequest::put().uri("/v1/combine?names=a,b&into=ab").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

		let req = test::TestRequest::put().uri("/v1/combine?names=a&into=ab").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

		let req = test::TestRequest::get().uri("/v1/graphs/ab/portable").to_request();
		let body = test::call_and_read_body(&app, req).await;
		assert_eq!(body, r#"{"one":{"two":1,"three":1},"two":{"one":1},"three":{"one":1}}"#);

		let req = test::TestRequest::get().uri("/v1/graphs").to_request();
		assert_eq!(test::call_and_read_body(&app, req).await, "a\nab\nb");

		let req = test::TestRequest::delete().uri("/v1/graphs/ab").to_request();
		assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
	}
}
