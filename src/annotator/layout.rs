//! Layout profiles: where thumbnails live in each page template family, where
//! their target URL sits relative to them, and which element gets annotated.

use crate::dom::{closest, last_descendant, query_all, ElementPattern, NodeId, PageDom};

const MODERN: &[ElementPattern] = &[
    // Every type except the video wall. The mini-player thumbnail has no href.
    ElementPattern {
        tag: Some("a"),
        id: Some("thumbnail"),
        attrs: &["href"],
        ..ElementPattern::ANY
    },
];

const CLASSIC: &[ElementPattern] = &[
    ElementPattern {
        classes: &["video-thumb"],
        not_classes: &[
            "yt-thumb-20",
            "yt-thumb-27",
            "yt-thumb-32",
            "yt-thumb-36",
            "yt-thumb-48",
            "yt-thumb-64",
        ],
        ..ElementPattern::ANY
    },
    ElementPattern {
        classes: &["thumb-wrapper"],
        ..ElementPattern::ANY
    },
    ElementPattern {
        classes: &["pl-header-thumb"],
        ..ElementPattern::ANY
    },
];

const GAMING: &[ElementPattern] = &[ElementPattern {
    tag: Some("ytg-thumbnail"),
    not_attrs: &["avatar"],
    not_classes: &[
        "avatar",
        "ytg-user-avatar",
        "ytg-box-art",
        "ytg-compact-gaming-event-renderer",
        "ytg-playlist-header-renderer",
    ],
    ..ElementPattern::ANY
}];

const MOBILE: &[ElementPattern] = &[
    ElementPattern {
        tag: Some("a"),
        classes: &["media-item-thumbnail-container"],
        ..ElementPattern::ANY
    },
    ElementPattern {
        tag: Some("a"),
        classes: &["compact-media-item-image"],
        ..ElementPattern::ANY
    },
    ElementPattern {
        tag: Some("a"),
        classes: &["video-card-image"],
        ..ElementPattern::ANY
    },
];

const VIDEO_WALL: &[ElementPattern] = &[ElementPattern {
    tag: Some("a"),
    classes: &["ytp-videowall-still"],
    ..ElementPattern::ANY
}];

const MOBILE_COMPACT_CONTAINER: ElementPattern = ElementPattern {
    classes: &["video-thumbnail-container-compact"],
    ..ElementPattern::ANY
};

/// Containers whose `#metadata-line` receives the percentage, per page:
/// home, trending/subscriptions (x2), channel, history, gaming, playlist.
const DESKTOP_ITEM_CONTAINERS: &[ElementPattern] = &[
    ElementPattern {
        classes: &["ytd-rich-item-renderer"],
        ..ElementPattern::ANY
    },
    ElementPattern {
        classes: &["ytd-grid-renderer"],
        ..ElementPattern::ANY
    },
    ElementPattern {
        classes: &["ytd-expanded-shelf-contents-renderer"],
        ..ElementPattern::ANY
    },
    ElementPattern {
        classes: &["yt-horizontal-list-renderer"],
        ..ElementPattern::ANY
    },
    ElementPattern {
        classes: &["ytd-item-section-renderer"],
        ..ElementPattern::ANY
    },
    ElementPattern {
        classes: &["ytd-horizontal-card-list-renderer"],
        ..ElementPattern::ANY
    },
    ElementPattern {
        classes: &["ytd-playlist-video-list-renderer"],
        ..ElementPattern::ANY
    },
];

const DESKTOP_METADATA_LINE: ElementPattern = ElementPattern {
    id: Some("metadata-line"),
    ..ElementPattern::ANY
};

const MOBILE_ITEM_CONTAINER: &[ElementPattern] = &[ElementPattern {
    tag: Some("ytm-media-item"),
    ..ElementPattern::ANY
}];

const MOBILE_METADATA_LINE: ElementPattern = ElementPattern {
    tag: Some("ytm-badge-and-byline-renderer"),
    ..ElementPattern::ANY
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutProfile {
    /// Material Design desktop.
    Modern,
    /// Pre-Polymer desktop (`disable_polymer=true`).
    Classic,
    Gaming,
    /// m.youtube.com
    Mobile,
    /// End-of-video suggestion wall; present in every layout.
    VideoWall,
}

/// Trial order for the sticky profile.
pub const PROFILE_PRIORITY: [LayoutProfile; 4] = [
    LayoutProfile::Modern,
    LayoutProfile::Classic,
    LayoutProfile::Gaming,
    LayoutProfile::Mobile,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlStep {
    Itself,
    Parent,
    Grandparent,
    GreatGrandparent,
    FirstChild,
    SecondChild,
}

impl UrlStep {
    fn locate<D: PageDom + ?Sized>(self, dom: &D, node: NodeId) -> Option<NodeId> {
        match self {
            Self::Itself => Some(node),
            Self::Parent => dom.parent(node),
            Self::Grandparent => dom.parent(node).and_then(|p| dom.parent(p)),
            Self::GreatGrandparent => dom
                .parent(node)
                .and_then(|p| dom.parent(p))
                .and_then(|p| dom.parent(p)),
            Self::FirstChild => dom.children(node).first().copied(),
            Self::SecondChild => dom.children(node).get(1).copied(),
        }
    }
}

impl LayoutProfile {
    pub fn name(self) -> &'static str {
        match self {
            Self::Modern => "modern",
            Self::Classic => "classic",
            Self::Gaming => "gaming",
            Self::Mobile => "mobile",
            Self::VideoWall => "video-wall",
        }
    }

    pub fn patterns(self) -> &'static [ElementPattern] {
        match self {
            Self::Modern => MODERN,
            Self::Classic => CLASSIC,
            Self::Gaming => GAMING,
            Self::Mobile => MOBILE,
            Self::VideoWall => VIDEO_WALL,
        }
    }

    pub fn matches<D: PageDom + ?Sized>(self, dom: &D, node: NodeId) -> bool {
        self.patterns().iter().any(|p| p.matches(dom, node))
    }

    /// Where to look for the `href`, in priority order.
    pub fn url_chain(self) -> &'static [UrlStep] {
        use UrlStep::*;
        match self {
            Self::Modern | Self::Mobile | Self::VideoWall => &[Itself],
            Self::Classic => &[Itself, Parent, Grandparent, FirstChild, SecondChild],
            Self::Gaming => &[Itself, Grandparent, GreatGrandparent],
        }
    }

    /// First non-empty `href` along the lookup chain.
    pub fn resolve_url<D: PageDom + ?Sized>(self, dom: &D, node: NodeId) -> Option<String> {
        self.url_chain()
            .iter()
            .filter_map(|step| step.locate(dom, node))
            .find_map(|n| dom.attr(n, "href").filter(|h| !h.is_empty()))
    }

    /// Element that carries the markers and the indicator.
    pub fn resolve_annotation_target<D: PageDom + ?Sized>(self, dom: &D, node: NodeId) -> NodeId {
        match self {
            // Sit above the hover preview video, which lives in the parent.
            Self::Gaming if !dom.is_tag(node, "a") => dom.parent(node).unwrap_or(node),
            Self::Mobile => dom
                .children(node)
                .first()
                .copied()
                .filter(|c| MOBILE_COMPACT_CONTAINER.matches(dom, *c))
                .unwrap_or(node),
            _ => node,
        }
    }

    /// Mobile recreates thumbnails off-screen, dropping the indicator while the
    /// markers survive.
    pub fn revalidates_indicator(self) -> bool {
        self == Self::Mobile
    }

    pub fn is_mobile(self) -> bool {
        self == Self::Mobile
    }

    /// Line of text next to the thumbnail where the percentage goes.
    pub fn metadata_line<D: PageDom + ?Sized>(self, dom: &D, target: NodeId) -> Option<NodeId> {
        let (containers, line) = if self.is_mobile() {
            (MOBILE_ITEM_CONTAINER, &MOBILE_METADATA_LINE)
        } else {
            (DESKTOP_ITEM_CONTAINERS, &DESKTOP_METADATA_LINE)
        };
        let container = closest(dom, target, containers)?;
        last_descendant(dom, container, line)
    }
}

/// A candidate element and the profile that found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub node: NodeId,
    pub profile: LayoutProfile,
}

/// Picks the page's profile once and sticks to it.
#[derive(Debug, Default)]
pub struct LayoutDetector {
    sticky: Option<LayoutProfile>,
}

impl LayoutDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<LayoutProfile> {
        self.sticky
    }

    /// Candidates of the sticky profile (choosing it on first success) plus
    /// video-wall stills, de-duplicated.
    pub fn candidates<D: PageDom + ?Sized>(&mut self, dom: &D) -> Vec<Candidate> {
        let mut out: Vec<Candidate> = match self.sticky {
            Some(profile) => tagged(profile, query_all(dom, profile.patterns())),
            None => {
                let mut found = Vec::new();
                for profile in PROFILE_PRIORITY {
                    let nodes = query_all(dom, profile.patterns());
                    if !nodes.is_empty() {
                        tracing::info!(target: "annotator", layout = profile.name(), "layout detected");
                        self.sticky = Some(profile);
                        found = tagged(profile, nodes);
                        break;
                    }
                }
                found
            }
        };

        for node in query_all(dom, LayoutProfile::VideoWall.patterns()) {
            if !out.iter().any(|c| c.node == node) {
                out.push(Candidate {
                    node,
                    profile: LayoutProfile::VideoWall,
                });
            }
        }
        out
    }
}

fn tagged(profile: LayoutProfile, nodes: Vec<NodeId>) -> Vec<Candidate> {
    nodes
        .into_iter()
        .map(|node| Candidate { node, profile })
        .collect()
}
