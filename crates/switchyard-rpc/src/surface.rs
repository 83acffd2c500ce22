//! Generates a typed handler trait and the router that serves it.
//!
//! Entries name either an `lsp_types` request/notification type, whose
//! `METHOD`, `Params` and `Result` are reused, or a wire name with explicit
//! parameter and result types. Request methods without an override answer
//! `MethodNotFound`; notification methods without one do nothing.

macro_rules! handler_surface {
    (
        $(#[$trait_meta:meta])*
        pub trait $trait_name:ident;

        $(#[$router_meta:meta])*
        pub fn $router_fn:ident($side:expr);

        required {
            $( $(#[$req_meta:meta])* fn $req_name:ident = $req_ty:ty; )*
        }
        requests {
            $( $(#[$rq_meta:meta])* fn $rq_name:ident = $rq_ty:ty; )*
        }
        custom_requests {
            $(
                $(#[$cr_meta:meta])*
                fn $cr_name:ident($cr_method:expr, $cr_params:ty) -> $cr_result:ty;
            )*
        }
        notifications {
            $( $(#[$nt_meta:meta])* fn $nt_name:ident = $nt_ty:ty; )*
        }
        custom_notifications {
            $( $(#[$cn_meta:meta])* fn $cn_name:ident($cn_method:expr, $cn_params:ty); )*
        }
    ) => {
        $(#[$trait_meta])*
        pub trait $trait_name: Send + Sync + 'static {
            $(
                $(#[$req_meta])*
                ///
                /// # Errors
                ///
                /// The returned error object is sent back to the peer.
                fn $req_name(
                    &self,
                    context: &$crate::RequestContext,
                    params: <$req_ty as ::lsp_types::request::Request>::Params,
                ) -> Result<
                    <$req_ty as ::lsp_types::request::Request>::Result,
                    $crate::ResponseError,
                >;
            )*

            $(
                $(#[$rq_meta])*
                ///
                /// # Errors
                ///
                /// Answers `MethodNotFound` unless overridden.
                fn $rq_name(
                    &self,
                    _context: &$crate::RequestContext,
                    _params: <$rq_ty as ::lsp_types::request::Request>::Params,
                ) -> Result<
                    <$rq_ty as ::lsp_types::request::Request>::Result,
                    $crate::ResponseError,
                > {
                    Err($crate::ResponseError::method_not_found(
                        <$rq_ty as ::lsp_types::request::Request>::METHOD,
                    ))
                }
            )*

            $(
                $(#[$cr_meta])*
                ///
                /// # Errors
                ///
                /// Answers `MethodNotFound` unless overridden.
                fn $cr_name(
                    &self,
                    _context: &$crate::RequestContext,
                    _params: $cr_params,
                ) -> Result<$cr_result, $crate::ResponseError> {
                    Err($crate::ResponseError::method_not_found($cr_method))
                }
            )*

            $(
                $(#[$nt_meta])*
                ///
                /// # Errors
                ///
                /// An error is logged; notifications are never answered.
                fn $nt_name(
                    &self,
                    _context: &$crate::RequestContext,
                    _params: <$nt_ty as ::lsp_types::notification::Notification>::Params,
                ) -> Result<(), $crate::ResponseError> {
                    Ok(())
                }
            )*

            $(
                $(#[$cn_meta])*
                ///
                /// # Errors
                ///
                /// An error is logged; notifications are never answered.
                fn $cn_name(
                    &self,
                    _context: &$crate::RequestContext,
                    _params: $cn_params,
                ) -> Result<(), $crate::ResponseError> {
                    Ok(())
                }
            )*
        }

        $(#[$router_meta])*
        ///
        /// # Errors
        ///
        /// Returns [`RouterError`](crate::RouterError) when the route table
        /// disagrees with the method registry.
        pub fn $router_fn<T: $trait_name>(
            handler: T,
        ) -> Result<$crate::Router<T>, $crate::RouterError> {
            $crate::RouterBuilder::new(handler, $side)
                $(
                    .request(
                        <$req_ty as ::lsp_types::request::Request>::METHOD,
                        |handler: &T,
                         context: &$crate::RequestContext,
                         params: <$req_ty as ::lsp_types::request::Request>::Params| {
                            handler.$req_name(context, params)
                        },
                    )
                )*
                $(
                    .request(
                        <$rq_ty as ::lsp_types::request::Request>::METHOD,
                        |handler: &T,
                         context: &$crate::RequestContext,
                         params: <$rq_ty as ::lsp_types::request::Request>::Params| {
                            handler.$rq_name(context, params)
                        },
                    )
                )*
                $(
                    .request(
                        $cr_method,
                        |handler: &T, context: &$crate::RequestContext, params: $cr_params| {
                            handler.$cr_name(context, params)
                        },
                    )
                )*
                $(
                    .notification(
                        <$nt_ty as ::lsp_types::notification::Notification>::METHOD,
                        |handler: &T,
                         context: &$crate::RequestContext,
                         params: <$nt_ty as ::lsp_types::notification::Notification>::Params| {
                            handler.$nt_name(context, params)
                        },
                    )
                )*
                $(
                    .notification(
                        $cn_method,
                        |handler: &T, context: &$crate::RequestContext, params: $cn_params| {
                            handler.$cn_name(context, params)
                        },
                    )
                )*
                .build()
        }
    };
}
