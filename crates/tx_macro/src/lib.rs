extern crate proc_macro;

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{parse_macro_input, FnArg, ItemFn, PatType};

/// Wraps an async method in a MongoDB transaction.
///
/// The annotated method must take `session: &mut Session` and return a
/// `Result`. The body is moved to a `<name>_in_tx` method; the generated
/// wrapper starts a transaction on the session, commits on `Ok` and aborts
/// on `Err`, so every `?` inside the body rolls the whole operation back.
#[proc_macro_attribute]
pub fn tx(_args: TokenStream, input: TokenStream) -> TokenStream {
    let input_fn = parse_macro_input!(input as ItemFn);
    let vis = &input_fn.vis;
    let body = &input_fn.block;
    let name = &input_fn.sig.ident;
    let args = &input_fn.sig.inputs;
    let ret = &input_fn.sig.output;

    let forwarded: Vec<_> = args
        .iter()
        .filter_map(|arg| match arg {
            FnArg::Typed(PatType { pat, .. }) => Some(quote! { #pat }),
            FnArg::Receiver(_) => None,
        })
        .collect();

    let inner = format_ident!("{}_in_tx", name);
    let expanded = quote! {
        #vis async fn #inner(#args) #ret {
            #body
        }

        #vis async fn #name(#args) #ret {
            session.start_transaction().await?;
            match self.#inner(#(#forwarded),*).await {
                Ok(value) => {
                    session.commit_transaction().await?;
                    Ok(value)
                }
                Err(err) => {
                    session.abort_transaction().await?;
                    Err(err)
                }
            }
        }
    };

    TokenStream::from(expanded)
}
