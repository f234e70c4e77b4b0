//! Prompt construction for outfit suggestions

use crate::store::Catalog;

const INSTRUCTION: &str = "Instruction: User has a set of clothes and you are an AI fashion stylist. \
Now choose a set of clothes according to the user's need.\n\
Return only images path of multiple sets of clothes in 2D list format, \
one inner list per outfit, inside a ```python code block.";

const CATALOG_HEADER: &str = "Image Path,Category,Color,Season";

/// Embed the whole catalog and the user's request in the stylist instruction
pub fn build_prompt(catalog: &Catalog, user_request: &str) -> String {
    let mut prompt = String::with_capacity(256 + catalog.len() * 64 + user_request.len());
    prompt.push_str(INSTRUCTION);
    prompt.push_str("\nset of clothes: {\n");
    prompt.push_str(CATALOG_HEADER);
    prompt.push('\n');

    for item in catalog {
        prompt.push_str(&format!(
            "{},{},{},{}\n",
            item.display_path(),
            item.category,
            item.color,
            item.season
        ));
    }

    prompt.push_str("}\nUser: ");
    prompt.push_str(user_request);
    prompt.push('\n');
    prompt
}
