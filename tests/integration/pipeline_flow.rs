use ctxkey::config::PipelineConfig;
use ctxkey::pipeline::{
    authorize_user, bytes_written_logging, handler_fn, hello, reference_pipeline, AuthorizedUser,
    Handler, Pipeline, Request, RequestKeys, RequestLogger, Response, Supervisor,
    STATUS_INTERNAL_ERROR, STATUS_OK,
};
use ctxkey::{KeyError, Scope};
use std::sync::Arc;

fn bob() -> PipelineConfig {
    PipelineConfig {
        user_name: "Bob".to_string(),
        user_id: 7,
    }
}

#[test]
fn outer_stage_observes_bytes_written_by_endpoint() {
    let keys = Arc::new(RequestKeys::new());
    let observed = Arc::new(parking_lot::Mutex::new(None));

    // outermost probe reads the slot the byte-accounting stage installs
    let probe = {
        let keys = keys.clone();
        let observed = observed.clone();
        move |next: Arc<dyn Handler>| -> Arc<dyn Handler> {
            let keys = keys.clone();
            let observed = observed.clone();
            Arc::new(handler_fn(move |req: Request| {
                let scope = keys.bytes_written.set_box(&req.scope);
                let resp = next.handle(req.with_scope(scope.clone()))?;
                *observed.lock() = Some(keys.bytes_written.value(&scope));
                Ok(resp)
            }))
        }
    };

    let handler = Pipeline::new()
        .stage(probe)
        .stage(authorize_user(keys.clone(), AuthorizedUser::from(&bob())))
        .build(Arc::new(hello(keys)));

    let resp = Supervisor::dispatch(handler.as_ref(), Request::new("/hello"));
    assert_eq!(resp, Response::ok("hello Bob\n"));
    assert_eq!(*observed.lock(), Some("hello Bob\n".len()));
}

#[test]
fn endpoint_without_installed_slot_hides_bytes_from_caller() {
    let keys = Arc::new(RequestKeys::new());
    let scope = keys
        .user
        .set(&Scope::background(), AuthorizedUser::from(&bob()));

    let endpoint = hello(keys.clone());
    let resp = endpoint.handle(Request::new("/hello").with_scope(scope.clone()));
    assert_eq!(resp.unwrap().status, STATUS_OK);
    assert_eq!(keys.bytes_written.value(&scope), 0);
}

#[test]
fn missing_authorization_is_reported_not_fatal() {
    let keys = Arc::new(RequestKeys::new());
    let handler = Pipeline::new()
        .stage(bytes_written_logging(keys.clone()))
        .build(Arc::new(hello(keys.clone())));

    let failed = Supervisor::dispatch(handler.as_ref(), Request::new("/hello"));
    assert_eq!(failed.status, STATUS_INTERNAL_ERROR);

    let healthy = reference_pipeline(keys, &bob());
    let resp = Supervisor::dispatch(healthy.as_ref(), Request::new("/hello"));
    assert_eq!(resp.status, STATUS_OK);
}

#[test]
fn empty_logger_rejected_by_stage() {
    let keys = Arc::new(RequestKeys::new());
    let handler = reference_pipeline(keys.clone(), &bob());
    let scope = keys
        .logger
        .set(&Scope::background(), RequestLogger::default());

    let resp = Supervisor::dispatch(handler.as_ref(), Request::new("/hello").with_scope(scope));
    assert_eq!(resp.status, STATUS_INTERNAL_ERROR);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_requests_share_base_scope() {
    let keys = Arc::new(RequestKeys::new());
    let handler = reference_pipeline(keys.clone(), &bob());
    let base = keys
        .logger
        .set(&Scope::background(), RequestLogger::new("tests"));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let handler = handler.clone();
        let base = base.clone();
        let path = if i % 4 == 3 { "/missing" } else { "/hello" };
        tasks.push(tokio::task::spawn_blocking(move || {
            Supervisor::dispatch(handler.as_ref(), Request::new(path).with_scope(base))
        }));
    }

    let mut ok = 0;
    for task in tasks {
        let resp = task.await.unwrap();
        if resp.status == STATUS_OK {
            assert_eq!(resp.body, "hello Bob\n");
            ok += 1;
        }
    }
    assert_eq!(ok, 6);
    // forked requests never leak values into the shared ancestor
    assert_eq!(keys.user.value(&base), None);
    assert_eq!(keys.bytes_written.value(&base), 0);
}

#[tokio::test]
async fn must_value_failure_aborts_only_its_task() {
    let keys = Arc::new(RequestKeys::new());

    let failing = tokio::spawn({
        let keys = keys.clone();
        async move { keys.user.must_value(&Scope::background()) }
    });
    let err = failing.await.unwrap_err();
    assert!(err.is_panic());
    let payload = err.into_panic();
    assert!(matches!(
        payload.downcast_ref::<KeyError>(),
        Some(KeyError::MissingKey { .. })
    ));

    let scope = keys
        .user
        .set(&Scope::background(), AuthorizedUser::from(&bob()));
    let healthy = tokio::spawn({
        let keys = keys.clone();
        async move { keys.user.must_value(&scope).name }
    });
    assert_eq!(healthy.await.unwrap(), "Bob");
}
