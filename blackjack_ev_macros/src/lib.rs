use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::ToTokens;
use syn::{parse_macro_input, parse_quote, Ident, ImplItemFn};

/// This macro is added before a method of `Table` struct in the impl block.
/// Use this macro to first check if current game phase is exactly the phase in
/// the attribute.
///
/// For example, `#[allowed_phase(PlayerTurn)]` will make a method first check
/// if current game phase is `PlayerTurn`. If not, the method returns
/// `Error::WrongPhase` before touching any state.
///
/// The expanded code refers to `GamePhase`, `self.current_game_phase` and
/// `crate::Error`, so the macro is only usable inside `blackjack_ev`.
#[proc_macro_attribute]
pub fn allowed_phase(attr: TokenStream, item: TokenStream) -> TokenStream {
    let phase = parse_macro_input!(attr as Ident);
    let mut method = parse_macro_input!(item as ImplItemFn);
    let action = method.sig.ident.to_string();

    let early_return: syn::Stmt = parse_quote! {
        if self.current_game_phase != GamePhase::#phase {
            return Err(crate::Error::WrongPhase {
                action: #action,
                expected: GamePhase::#phase,
                actual: self.current_game_phase,
            }
            .into());
        }
    };
    method.block.stmts.insert(0, early_return);

    let expanded: TokenStream2 = method.into_token_stream();
    expanded.into()
}
